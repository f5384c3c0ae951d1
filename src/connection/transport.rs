//! Transport abstraction (TCP with optional TLS)

use super::tls::TrustBundle;
use crate::{Error, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Transport layer abstraction
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP connection
    Plain(TcpStream),
    /// TLS-encrypted TCP connection
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
    /// Scripted I/O for unit tests
    #[cfg(test)]
    Mock(tokio_test::io::Mock),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain(TcpStream)"),
            Transport::Tls(_) => f.write_str("Transport::Tls(TlsStream)"),
            #[cfg(test)]
            Transport::Mock(_) => f.write_str("Transport::Mock"),
        }
    }
}

impl Transport {
    /// Connect via plain TCP
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Transport::Plain(stream))
    }

    /// Wrap a plain TCP transport in TLS using the trust bundle
    ///
    /// `host` is the dialed host; the bundle's server-name override, when set,
    /// takes precedence for certificate verification.
    pub async fn upgrade_to_tls(self, bundle: &TrustBundle, host: &str) -> Result<Self> {
        match self {
            Transport::Plain(tcp_stream) => {
                let server_name = bundle.server_name_for(host)?;
                let connector = tokio_rustls::TlsConnector::from(bundle.client_config());
                let tls_stream = connector.connect(server_name, tcp_stream).await?;
                Ok(Transport::Tls(tls_stream))
            }
            Transport::Tls(_) => Err(Error::Config("transport is already TLS-encrypted".into())),
            #[cfg(test)]
            Transport::Mock(_) => Err(Error::Config("cannot upgrade mock transport".into())),
        }
    }

    /// Whether the transport is encrypted
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Write all bytes to the transport
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.write_all(buf).await?,
            Transport::Tls(stream) => stream.write_all(buf).await?,
            #[cfg(test)]
            Transport::Mock(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    /// Flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush().await?,
            Transport::Tls(stream) => stream.flush().await?,
            #[cfg(test)]
            Transport::Mock(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Read bytes into buffer
    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Transport::Plain(stream) => stream.read_buf(buf).await?,
            Transport::Tls(stream) => stream.read_buf(buf).await?,
            #[cfg(test)]
            Transport::Mock(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }

    /// Shutdown the transport
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.shutdown().await?,
            Transport::Tls(stream) => stream.shutdown().await?,
            #[cfg(test)]
            Transport::Mock(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}
