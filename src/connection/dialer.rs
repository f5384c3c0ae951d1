//! Dial strategy: TCP connect, optional TLS, optional ACL auth

use super::addr::split_host_port;
use super::conn::Connection;
use super::options::ConnectionOptions;
use super::tls::TrustBundle;
use super::transport::Transport;
use crate::error::DialPhase;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Initial ACL credentials presented on every new connection
#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Builds new physical connections to one store
///
/// The connect timeout bounds TCP connect and TLS negotiation together.
/// Read and write timeouts are carried into every connection produced.
#[derive(Debug, Clone)]
pub struct Dialer {
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    credentials: Option<Credentials>,
    tls: Option<TrustBundle>,
}

impl Dialer {
    /// Build a dialer from options
    ///
    /// TLS material is loaded here, so malformed or unreadable files fail
    /// before any network I/O.
    pub fn from_options(opts: &ConnectionOptions) -> Result<Self> {
        opts.validate()?;

        let tls = if opts.tls_enabled() {
            Some(TrustBundle::from_options(opts)?)
        } else {
            None
        };

        let credentials = opts.acl_enabled().then(|| Credentials {
            username: opts.username().to_string(),
            password: opts.password().to_string(),
        });

        Ok(Self {
            connect_timeout: opts.dial_connect_timeout(),
            read_timeout: opts.dial_read_timeout(),
            write_timeout: opts.dial_write_timeout(),
            credentials,
            tls,
        })
    }

    /// Connect timeout applied to each dial
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whether dialed connections negotiate TLS
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Whether dialed connections authenticate
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Open one ready-to-use connection to `addr`
    pub async fn dial(&self, addr: &str) -> Result<Connection> {
        let start = Instant::now();
        crate::metrics::counters::dial_attempted();

        let result = self
            .dial_inner(addr, start)
            .instrument(tracing::debug_span!(
                "dial",
                addr = %addr,
                tls = self.tls.is_some(),
                acl = self.credentials.is_some()
            ))
            .await;

        crate::metrics::histograms::dial_duration(start.elapsed().as_millis() as u64);
        if let Err(Error::Dial { phase, reason, .. }) = &result {
            crate::metrics::counters::dial_failed(*phase);
            tracing::warn!(addr = %addr, %phase, %reason, "dial failed");
        }
        result
    }

    async fn dial_inner(&self, addr: &str, start: Instant) -> Result<Connection> {
        let dial_err = |phase: DialPhase, reason: String| Error::Dial {
            addr: addr.to_string(),
            phase,
            reason,
        };

        let transport = tokio::time::timeout(self.connect_timeout, Transport::connect_tcp(addr))
            .await
            .map_err(|_| {
                dial_err(
                    DialPhase::Tcp,
                    format!("timed out after {:?}", self.connect_timeout),
                )
            })?
            .map_err(|e| dial_err(DialPhase::Tcp, e.to_string()))?;

        let mut conn = Connection::new(transport, self.read_timeout, self.write_timeout);

        if let Some(bundle) = &self.tls {
            let host = match split_host_port(addr) {
                Ok((host, _)) => host,
                Err(_) => addr.to_string(),
            };
            let remaining = self.connect_timeout.saturating_sub(start.elapsed());
            tokio::time::timeout(remaining, conn.negotiate_tls(bundle, &host))
                .await
                .map_err(|_| {
                    dial_err(
                        DialPhase::Tls,
                        format!("handshake timed out after {:?}", self.connect_timeout),
                    )
                })?
                .map_err(|e| dial_err(DialPhase::Tls, e.to_string()))?;
        }

        if let Some(creds) = &self.credentials {
            conn.authenticate(&creds.username, &creds.password)
                .await
                .map_err(|e| dial_err(DialPhase::Auth, e.to_string()))?;
        }

        conn.finish_startup()?;
        tracing::debug!(tls = conn.is_tls(), "connection ready");
        Ok(conn)
    }
}
