//! Connection pooling
//!
//! A [`Pool`] keeps a fixed number of connections to one address open,
//! hands commands to them round-robin, and re-dials dropped connections in
//! the background with bounded exponential backoff.

pub mod backoff;
pub mod config;
pub mod connector;
mod core;

pub use self::core::Pool;
pub use backoff::ReconnectBackoff;
pub use config::{PoolConfig, MAX_RECONNECT_INTERVAL, MIN_RECONNECT_INTERVAL, POOL_SIZE};
pub use connector::{Connector, Duplex};

use crate::protocol::{Cmd, Frame};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Command execution surface of a pool
///
/// Clients are written against this trait rather than [`Pool`] directly so
/// that the post-connect handshake can run against any pool implementation.
#[async_trait]
pub trait CommandPool: Send + Sync + 'static {
    /// Execute one command, bounded by `deadline`
    async fn exec(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame>;

    /// Close every connection; a second call fails with `PoolClosed`
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<C: Connector> CommandPool for Pool<C> {
    async fn exec(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame> {
        Pool::exec(self, cmd, deadline).await
    }

    async fn close(&self) -> Result<()> {
        Pool::close(self).await
    }
}
