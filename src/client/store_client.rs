//! Client handle wrapping one pool

use crate::pool::{CommandPool, Pool};
use crate::connection::Dialer;
use crate::protocol::{Cmd, Frame};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Command execution and release, as seen by store consumers
///
/// Handlers depend on this trait rather than on [`Client`], so tests can
/// substitute an in-memory implementation.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Execute one command within the client's default deadline
    async fn exec(&self, cmd: &Cmd) -> Result<Frame>;

    /// Execute one command within an explicit deadline
    async fn exec_within(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame>;

    /// Release the client's connections
    ///
    /// Not idempotent: a second call returns the pool's `PoolClosed` error.
    async fn close(&self) -> Result<()>;
}

/// The production client: a pool of dialed connections
pub type PooledClient = Client<Pool<Dialer>>;

/// Thin handle over exactly one pool
///
/// Only handed out after the pool is built and the post-connect handshake
/// has succeeded.
pub struct Client<P: CommandPool> {
    pool: P,
    addr: String,
    deadline: Duration,
}

impl<P: CommandPool> Client<P> {
    /// Wrap a configured pool
    pub fn new(pool: P, addr: impl Into<String>, deadline: Duration) -> Self {
        Self {
            pool,
            addr: addr.into(),
            deadline,
        }
    }

    /// Address the pool is connected to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Deadline applied by [`StoreClient::exec`]
    pub fn default_deadline(&self) -> Duration {
        self.deadline
    }

    /// Underlying pool
    pub fn pool(&self) -> &P {
        &self.pool
    }
}

#[async_trait]
impl<P: CommandPool> StoreClient for Client<P> {
    async fn exec(&self, cmd: &Cmd) -> Result<Frame> {
        self.exec_within(cmd, self.deadline).await
    }

    async fn exec_within(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame> {
        self.pool.exec(cmd, deadline).await.map_err(|e| {
            tracing::debug!(addr = %self.addr, command = %cmd, error = %e, "command failed");
            Error::Command {
                action: cmd.to_string(),
                source: Box::new(e),
            }
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await
    }
}

impl<P: CommandPool> std::fmt::Debug for Client<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.addr)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory pool implementing GET/SET
    #[derive(Default)]
    struct MapPool {
        data: Mutex<HashMap<Vec<u8>, bytes::Bytes>>,
        closes: AtomicU32,
        deadlines: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl CommandPool for MapPool {
        async fn exec(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame> {
            self.deadlines.lock().unwrap().push(deadline);
            let args = cmd.args();
            match cmd.name().as_str() {
                "SET" => {
                    self.data
                        .lock()
                        .unwrap()
                        .insert(args[1].to_vec(), args[2].clone());
                    Ok(Frame::Simple("OK".into()))
                }
                "GET" => Ok(Frame::Bulk(self.data.lock().unwrap().get(&args[1][..]).cloned())),
                _ => Err(Error::Server("ERR unknown command".into())),
            }
        }

        async fn close(&self) -> Result<()> {
            if self.closes.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(Error::PoolClosed);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let client = Client::new(MapPool::default(), "store:6379", Duration::from_secs(2));

        client.exec(&Cmd::set("k", "v")).await.unwrap().expect_ok().unwrap();
        let value = client.exec(&Cmd::get("k")).await.unwrap().into_string().unwrap();
        assert_eq!(value.as_deref(), Some("v"));
        assert_eq!(
            *client.pool().deadlines.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_error_carries_action() {
        let client = Client::new(MapPool::default(), "store:6379", Duration::from_secs(2));

        let err = client.exec(&Cmd::new("FLUSHALL")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to perform action FLUSHALL: server error: ERR unknown command"
        );
        assert_eq!(err.kind(), crate::error::ErrorKind::Command);
    }

    #[tokio::test]
    async fn test_error_redacts_secret_action() {
        let client = Client::new(MapPool::default(), "store:6379", Duration::from_secs(2));

        let err = client
            .exec(&Cmd::config_set("masterauth", "s3cret"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CONFIG SET masterauth <redacted>"));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[tokio::test]
    async fn test_exec_within_uses_given_deadline() {
        let client = Client::new(MapPool::default(), "store:6379", Duration::from_secs(2));

        client
            .exec_within(&Cmd::get("k"), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(
            *client.pool().deadlines.lock().unwrap(),
            vec![Duration::from_millis(50)]
        );
    }

    #[tokio::test]
    async fn test_second_close_propagates() {
        let client = Client::new(MapPool::default(), "store:6379", Duration::from_secs(2));

        client.close().await.unwrap();
        assert!(matches!(client.close().await, Err(Error::PoolClosed)));
    }
}
