//! TLS material loading for secure connections to the store.
//!
//! A [`TrustBundle`] is built from local files only: a CA certificate file
//! that becomes the root of trust, and a client certificate/key pair that
//! identifies this process to the store. Nothing here touches the network.

use super::options::ConnectionOptions;
use crate::{Error, Result};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::Item;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Verified trust roots plus exactly one client identity
///
/// Owned by the dialer that consumes it; never mutated after creation.
#[derive(Clone)]
pub struct TrustBundle {
    client_config: Arc<ClientConfig>,
    root_count: usize,
    server_name: Option<String>,
}

impl TrustBundle {
    /// Load the bundle described by connection options
    pub fn from_options(opts: &ConnectionOptions) -> Result<Self> {
        Self::load(
            opts.ca_cert_path(),
            opts.client_cert_path(),
            opts.client_key_path(),
            opts.subject_common_name(),
        )
    }

    /// Load a CA file and a client certificate/key pair
    ///
    /// # Errors
    ///
    /// - `TlsMaterialIo` if the CA file cannot be read
    /// - `UntrustedCa` if the CA file holds no usable certificate
    /// - `ClientIdentity` if the certificate/key pair cannot be read or parsed
    pub fn load(
        ca_cert: &Path,
        client_cert: &Path,
        client_key: &Path,
        server_name: Option<&str>,
    ) -> Result<Self> {
        let roots = load_roots(ca_cert)?;
        let root_count = roots.len();

        let (chain, key) = load_identity(client_cert, client_key)?;

        let client_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_client_auth_cert(chain, key)
            .map_err(|e| Error::ClientIdentity {
                cert: client_cert.to_path_buf(),
                key: client_key.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client_config: Arc::new(client_config),
            root_count,
            server_name: server_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        })
    }

    /// The rustls client configuration for this bundle
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Number of trusted root certificates
    pub fn root_count(&self) -> usize {
        self.root_count
    }

    /// Name override used for hostname verification, if any
    pub fn server_name_override(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Name to verify the server certificate against when dialing `host`
    pub fn server_name_for(&self, host: &str) -> Result<ServerName<'static>> {
        let name = self.server_name.as_deref().unwrap_or(host);
        ServerName::try_from(name.to_string())
            .map_err(|_| Error::Config(format!("invalid server name for TLS: '{}'", name)))
    }
}

impl std::fmt::Debug for TrustBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustBundle")
            .field("root_count", &self.root_count)
            .field("server_name", &self.server_name)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Parse every PEM certificate in the CA file into a root store
fn load_roots(ca_path: &Path) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| Error::TlsMaterialIo {
        path: ca_path.to_path_buf(),
        source: e,
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut root_store = RootCertStore::empty();

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let (added, ignored) = root_store.add_parsable_certificates(std::iter::once(cert));
                if ignored > 0 {
                    tracing::debug!(path = %ca_path.display(), added, ignored, "skipped unparsable CA certificate");
                }
            }
            Ok(Some(_)) => {
                // Skip non-certificate items (private keys, CRLs)
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(path = %ca_path.display(), error = %e, "stopped reading malformed PEM");
                break;
            }
        }
    }

    if root_store.is_empty() {
        return Err(Error::UntrustedCa(ca_path.to_path_buf()));
    }

    Ok(root_store)
}

/// Read the client certificate chain and its private key
fn load_identity(
    cert_path: &Path,
    key_path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let identity_err = |reason: String| Error::ClientIdentity {
        cert: PathBuf::from(cert_path),
        key: PathBuf::from(key_path),
        reason,
    };

    let cert_data = fs::read(cert_path).map_err(|e| identity_err(e.to_string()))?;
    let chain = rustls_pemfile::certs(&mut std::io::Cursor::new(&cert_data))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| identity_err(format!("invalid certificate PEM: {}", e)))?;
    if chain.is_empty() {
        return Err(identity_err("no certificate found".into()));
    }

    let key_data = fs::read(key_path).map_err(|e| identity_err(e.to_string()))?;
    let key = rustls_pemfile::private_key(&mut std::io::Cursor::new(&key_data))
        .map_err(|e| identity_err(format!("invalid key PEM: {}", e)))?
        .ok_or_else(|| identity_err("no private key found".into()))?;

    Ok((chain, key))
}
