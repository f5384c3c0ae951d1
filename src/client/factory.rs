//! Client factory and scoped acquisition

use super::handshake::post_connect;
use super::store_client::{Client, PooledClient, StoreClient};
use crate::connection::{ConnectionOptions, Dialer};
use crate::pool::{Pool, PoolConfig};
use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::Instrument;

/// Something that can hand out configured clients for an address
#[async_trait]
pub trait ClientProducer: Send + Sync {
    /// Client type produced
    type Client: StoreClient;

    /// Build a fully configured client for `addr`
    ///
    /// An error means no usable client exists; nothing needs closing.
    async fn new_client(&self, addr: &str) -> Result<Self::Client>;
}

/// Builds pooled clients from connection options
///
/// TLS material is read on every call to [`ClientFactory::new_client`];
/// nothing is cached between clients.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> shortkv::Result<()> {
/// use shortkv::client::{ClientFactory, ClientProducer, StoreClient};
/// use shortkv::connection::ConnectionOptions;
/// use shortkv::protocol::Cmd;
///
/// let factory = ClientFactory::new(ConnectionOptions::default());
/// let client = factory.new_client("db:6379").await?;
/// client.exec(&Cmd::set("abc123", "https://example.com")).await?;
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientFactory {
    options: ConnectionOptions,
    pool_config: Option<PoolConfig>,
}

impl ClientFactory {
    /// Create a factory with default pool settings
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            pool_config: None,
        }
    }

    /// Create a factory from `STORE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ConnectionOptions::from_env()?))
    }

    /// Override pool sizing, pinging and reconnect bounds
    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = Some(config);
        self
    }

    /// Connection options in use
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Pool configuration applied to new clients
    ///
    /// Unless overridden, construction is bounded by the dial connect timeout.
    pub fn pool_config(&self) -> PoolConfig {
        self.pool_config
            .clone()
            .unwrap_or_else(|| PoolConfig::new(self.options.dial_connect_timeout()))
    }

    async fn build(&self, addr: &str) -> Result<PooledClient> {
        // Reads and parses TLS material; fails before any network I/O
        let dialer = Dialer::from_options(&self.options)?;

        let pool = Pool::build(addr, dialer, self.pool_config()).await?;
        post_connect(&pool, addr, &self.options).await?;

        let deadline = self.options.dial_read_timeout() + self.options.dial_write_timeout();
        tracing::info!(tls = self.options.tls_enabled(), acl = self.options.acl_enabled(), "client ready");
        Ok(Client::new(pool, addr, deadline))
    }
}

#[async_trait]
impl ClientProducer for ClientFactory {
    type Client = PooledClient;

    async fn new_client(&self, addr: &str) -> Result<PooledClient> {
        let span = tracing::info_span!("new_client", addr = %addr);
        self.build(addr).instrument(span).await
    }
}

/// Acquire a client, run `f` with it, and always close it
///
/// If `f` fails its error is returned and a close failure is only logged.
/// If `f` succeeds, a close failure is returned instead of the value.
///
/// # Examples
///
/// ```no_run
/// # async fn example(factory: shortkv::client::ClientFactory) -> shortkv::Result<()> {
/// use shortkv::client::{with_client, StoreClient};
/// use shortkv::protocol::Cmd;
///
/// let reply = with_client(&factory, "db:6379", |client| {
///     Box::pin(async move { client.exec(&Cmd::get("abc123")).await })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_client<P, T, F>(producer: &P, addr: &str, f: F) -> Result<T>
where
    P: ClientProducer + ?Sized,
    F: for<'c> FnOnce(&'c P::Client) -> BoxFuture<'c, Result<T>>,
{
    let client = producer.new_client(addr).await?;
    let result = f(&client).await;
    let closed = client.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!(addr, error = %close_err, "failed to close client");
            }
            Err(e)
        }
    }
}
