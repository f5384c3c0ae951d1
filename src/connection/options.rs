//! Connection options
//!
//! Options are built once (builder, environment, or deserialized config) and
//! never mutated afterwards; every dial reads them by shared reference.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Address the redirector talks to when none is configured
pub const DEFAULT_STORE_ADDR: &str = "db:6379";

/// Default TCP/TLS connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default socket write timeout
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default socket read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// TLS, ACL and timeout parameters for one connection attempt
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConnectionOptions {
    tls_enabled: bool,
    ca_cert_path: PathBuf,
    client_cert_path: PathBuf,
    client_key_path: PathBuf,
    subject_common_name: String,

    acl_enabled: bool,
    username: String,
    password: String,

    #[serde(rename = "dial_connect_timeout_ms", with = "duration_ms")]
    dial_connect_timeout: Duration,
    #[serde(rename = "dial_write_timeout_ms", with = "duration_ms")]
    dial_write_timeout: Duration,
    #[serde(rename = "dial_read_timeout_ms", with = "duration_ms")]
    dial_read_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            tls_enabled: false,
            ca_cert_path: PathBuf::new(),
            client_cert_path: PathBuf::new(),
            client_key_path: PathBuf::new(),
            subject_common_name: String::new(),
            acl_enabled: false,
            username: String::new(),
            password: String::new(),
            dial_connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            dial_write_timeout: DEFAULT_WRITE_TIMEOUT,
            dial_read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl ConnectionOptions {
    /// Create a builder starting from the defaults
    ///
    /// # Examples
    ///
    /// ```
    /// use shortkv::connection::ConnectionOptions;
    /// use std::time::Duration;
    ///
    /// let opts = ConnectionOptions::builder()
    ///     .acl("app", "secret")
    ///     .dial_connect_timeout(Duration::from_secs(3))
    ///     .build();
    /// assert!(opts.acl_enabled());
    /// ```
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder {
            opts: Self::default(),
        }
    }

    /// Load options from `STORE_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(v) = lookup("STORE_TLS_ENABLED") {
            opts.tls_enabled = parse_bool("STORE_TLS_ENABLED", &v)?;
        }
        if let Some(v) = lookup("STORE_CA_CERT") {
            opts.ca_cert_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STORE_CLIENT_CERT") {
            opts.client_cert_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STORE_CLIENT_KEY") {
            opts.client_key_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STORE_SUBJECT_CN") {
            opts.subject_common_name = v;
        }
        if let Some(v) = lookup("STORE_ACL_ENABLED") {
            opts.acl_enabled = parse_bool("STORE_ACL_ENABLED", &v)?;
        }
        if let Some(v) = lookup("STORE_USERNAME") {
            opts.username = v;
        }
        if let Some(v) = lookup("STORE_PASSWORD") {
            opts.password = v;
        }
        if let Some(v) = lookup("STORE_DIAL_CONNECT_TIMEOUT_MS") {
            opts.dial_connect_timeout = parse_millis("STORE_DIAL_CONNECT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("STORE_DIAL_WRITE_TIMEOUT_MS") {
            opts.dial_write_timeout = parse_millis("STORE_DIAL_WRITE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("STORE_DIAL_READ_TIMEOUT_MS") {
            opts.dial_read_timeout = parse_millis("STORE_DIAL_READ_TIMEOUT_MS", &v)?;
        }

        Ok(opts)
    }

    /// Check that enabled features carry the inputs they need
    pub fn validate(&self) -> Result<()> {
        if self.tls_enabled {
            for (name, path) in [
                ("ca_cert_path", &self.ca_cert_path),
                ("client_cert_path", &self.client_cert_path),
                ("client_key_path", &self.client_key_path),
            ] {
                if path.as_os_str().is_empty() {
                    return Err(Error::Config(format!("TLS enabled but {} is empty", name)));
                }
            }
        }
        if self.acl_enabled && self.password.is_empty() {
            return Err(Error::Config("ACL enabled but password is empty".into()));
        }
        for (name, timeout) in [
            ("dial connect timeout", self.dial_connect_timeout),
            ("dial write timeout", self.dial_write_timeout),
            ("dial read timeout", self.dial_read_timeout),
        ] {
            if timeout.is_zero() {
                return Err(Error::Config(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    /// Whether connections negotiate TLS
    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    /// Trusted root certificate file
    pub fn ca_cert_path(&self) -> &PathBuf {
        &self.ca_cert_path
    }

    /// Client certificate file
    pub fn client_cert_path(&self) -> &PathBuf {
        &self.client_cert_path
    }

    /// Client private key file
    pub fn client_key_path(&self) -> &PathBuf {
        &self.client_key_path
    }

    /// Server name override for hostname verification, if any
    pub fn subject_common_name(&self) -> Option<&str> {
        if self.subject_common_name.is_empty() {
            None
        } else {
            Some(&self.subject_common_name)
        }
    }

    /// Whether ACL credentials are used
    pub fn acl_enabled(&self) -> bool {
        self.acl_enabled
    }

    /// ACL username (may be empty for the default user)
    pub fn username(&self) -> &str {
        &self.username
    }

    /// ACL password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Connect timeout
    pub fn dial_connect_timeout(&self) -> Duration {
        self.dial_connect_timeout
    }

    /// Write timeout
    pub fn dial_write_timeout(&self) -> Duration {
        self.dial_write_timeout
    }

    /// Read timeout
    pub fn dial_read_timeout(&self) -> Duration {
        self.dial_read_timeout
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("tls_enabled", &self.tls_enabled)
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_cert_path", &self.client_cert_path)
            .field("client_key_path", &self.client_key_path)
            .field("subject_common_name", &self.subject_common_name)
            .field("acl_enabled", &self.acl_enabled)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dial_connect_timeout", &self.dial_connect_timeout)
            .field("dial_write_timeout", &self.dial_write_timeout)
            .field("dial_read_timeout", &self.dial_read_timeout)
            .finish()
    }
}

/// Builder for `ConnectionOptions`
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    /// Enable TLS with a CA file and a client certificate/key pair
    pub fn tls(
        mut self,
        ca_cert: impl Into<PathBuf>,
        client_cert: impl Into<PathBuf>,
        client_key: impl Into<PathBuf>,
    ) -> Self {
        self.opts.tls_enabled = true;
        self.opts.ca_cert_path = ca_cert.into();
        self.opts.client_cert_path = client_cert.into();
        self.opts.client_key_path = client_key.into();
        self
    }

    /// Verify the server certificate against this name instead of the dialed host
    pub fn subject_common_name(mut self, name: impl Into<String>) -> Self {
        self.opts.subject_common_name = name.into();
        self
    }

    /// Enable ACL authentication
    pub fn acl(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.acl_enabled = true;
        self.opts.username = username.into();
        self.opts.password = password.into();
        self
    }

    /// Set the connect timeout
    pub fn dial_connect_timeout(mut self, timeout: Duration) -> Self {
        self.opts.dial_connect_timeout = timeout;
        self
    }

    /// Set the write timeout
    ///
    /// Must be non-zero; [`ConnectionOptions::validate`] rejects zero.
    pub fn dial_write_timeout(mut self, timeout: Duration) -> Self {
        self.opts.dial_write_timeout = timeout;
        self
    }

    /// Set the read timeout
    ///
    /// Must be non-zero; [`ConnectionOptions::validate`] rejects zero.
    pub fn dial_read_timeout(mut self, timeout: Duration) -> Self {
        self.opts.dial_read_timeout = timeout;
        self
    }

    /// Build the options
    pub fn build(self) -> ConnectionOptions {
        self.opts
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "invalid boolean '{}' for {}",
            other, name
        ))),
    }
}

fn parse_millis(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| Error::Config(format!("invalid milliseconds '{}' for {}", value, name)))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
