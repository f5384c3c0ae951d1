//! Seams between the pool and the connections it manages

use crate::connection::{Connection, Dialer};
use crate::protocol::{Cmd, Frame};
use crate::Result;
use async_trait::async_trait;

/// A live request/reply connection owned by a pool slot
#[async_trait]
pub trait Duplex: Send + 'static {
    /// Send one command and wait for its reply
    async fn round_trip(&mut self, cmd: &Cmd) -> Result<Frame>;

    /// Whether the connection can take another command
    fn is_usable(&self) -> bool;

    /// Close the connection
    async fn shutdown(&mut self) -> Result<()>;
}

/// Produces new connections for a pool
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced
    type Conn: Duplex;

    /// Open one ready-to-use connection to `addr`
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

#[async_trait]
impl Duplex for Connection {
    async fn round_trip(&mut self, cmd: &Cmd) -> Result<Frame> {
        Connection::round_trip(self, cmd).await
    }

    fn is_usable(&self) -> bool {
        Connection::is_usable(self)
    }

    async fn shutdown(&mut self) -> Result<()> {
        Connection::shutdown(self).await
    }
}

#[async_trait]
impl Connector for Dialer {
    type Conn = Connection;

    async fn connect(&self, addr: &str) -> Result<Connection> {
        self.dial(addr).await
    }
}
