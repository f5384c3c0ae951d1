//! Core connection type

use super::state::ConnectionState;
use super::tls::TrustBundle;
use super::transport::Transport;
use crate::protocol::{decode_frame, encode_command_into, Cmd, Frame};
use crate::{Error, Result};
use bytes::{Buf, BytesMut};
use std::io;
use std::time::Duration;

/// One live duplex connection to the store
///
/// Commands are strictly request/reply: a connection never has more than
/// one command in flight. If a call is abandoned while in flight (its
/// future dropped by a deadline) the connection stays in `InFlight` and
/// reports itself unusable, since the pending reply would desynchronise
/// the stream.
pub struct Connection {
    transport: Option<Transport>,
    state: ConnectionState,
    read_buf: BytesMut,
    write_buf: BytesMut,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Connection {
    /// Create connection from transport
    pub fn new(transport: Transport, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            transport: Some(transport),
            state: ConnectionState::Initial,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(256),
            read_timeout,
            write_timeout,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a new command may be issued
    pub fn is_usable(&self) -> bool {
        self.state == ConnectionState::Ready && self.transport.is_some()
    }

    /// Whether the transport is TLS-encrypted
    pub fn is_tls(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_tls)
    }

    /// Negotiate TLS over the freshly connected socket
    pub async fn negotiate_tls(&mut self, bundle: &TrustBundle, host: &str) -> Result<()> {
        self.state.transition(ConnectionState::NegotiatingTls)?;

        let transport = self.transport.take().ok_or(Error::ConnectionClosed)?;
        self.transport = Some(transport.upgrade_to_tls(bundle, host).await?);
        tracing::debug!(host, "TLS connection established");
        Ok(())
    }

    /// Perform the initial ACL authentication (`AUTH`)
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        self.state.transition(ConnectionState::Authenticating)?;

        let cmd = Cmd::auth(username, password);
        self.send(&cmd).await?;
        self.receive().await?.expect_ok()
    }

    /// Mark the startup sequence complete
    pub fn finish_startup(&mut self) -> Result<()> {
        self.state.transition(ConnectionState::Ready)
    }

    /// Send one command and wait for its reply
    ///
    /// A `-ERR` reply is returned as `Error::Server` and leaves the
    /// connection usable. I/O failures, timeouts and protocol violations
    /// leave it unusable.
    pub async fn round_trip(&mut self, cmd: &Cmd) -> Result<Frame> {
        if self.state != ConnectionState::Ready {
            return Err(Error::InvalidState {
                expected: ConnectionState::Ready.to_string(),
                actual: self.state.to_string(),
            });
        }

        self.state.transition(ConnectionState::InFlight)?;
        self.send(cmd).await?;
        let frame = self.receive().await?;
        self.state.transition(ConnectionState::Ready)?;

        match frame {
            Frame::Error(msg) => Err(Error::Server(msg)),
            frame => Ok(frame),
        }
    }

    /// Close the connection in place; later calls fail with `ConnectionClosed`
    pub async fn shutdown(&mut self) -> Result<()> {
        self.state.transition(ConnectionState::Closed)?;
        match self.transport.take() {
            Some(mut transport) => transport.shutdown().await,
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Encode and write a command, bounded by the write timeout
    async fn send(&mut self, cmd: &Cmd) -> Result<()> {
        self.write_buf.clear();
        encode_command_into(cmd, &mut self.write_buf);

        let timeout = self.write_timeout;
        let buf = &self.write_buf;
        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
        let write = async move {
            transport.write_all(buf).await?;
            transport.flush().await
        };
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Read one reply frame, bounded by the read timeout
    async fn receive(&mut self) -> Result<Frame> {
        let timeout = self.read_timeout;
        tokio::time::timeout(timeout, self.read_frame())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match decode_frame(&self.read_buf) {
                Ok((frame, consumed)) => {
                    self.read_buf.advance(consumed);
                    return Ok(frame);
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                Err(e) => return Err(Error::Protocol(e.to_string())),
            }

            // Need more data
            let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("transport", &self.transport)
            .field("buffered", &self.read_buf.len())
            .finish()
    }
}
