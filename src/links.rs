//! Short link storage
//!
//! The store-side half of the redirector's resolve and shorten handlers.
//! Each operation acquires its own client and releases it before returning.

use crate::client::{with_client, ClientProducer, StoreClient};
use crate::protocol::Cmd;
use crate::{Error, Result};

/// Short-key to URL mapping held in the store
#[derive(Debug, Clone)]
pub struct LinkStore<P: ClientProducer> {
    producer: P,
    addr: String,
}

impl<P: ClientProducer> LinkStore<P> {
    /// Store links at `addr` using clients from `producer`
    pub fn new(producer: P, addr: impl Into<String>) -> Self {
        Self {
            producer,
            addr: addr.into(),
        }
    }

    /// Store address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Look up the URL behind `short`
    ///
    /// `Ok(None)` means the store answered and holds no such key; failing to
    /// reach the store is an `Err`.
    pub async fn resolve(&self, short: &str) -> Result<Option<String>> {
        let key = short.to_owned();
        let url = with_client(&self.producer, &self.addr, move |client| {
            Box::pin(async move { client.exec(&Cmd::get(key)).await?.into_string() })
        })
        .await?;

        tracing::debug!(short, found = url.is_some(), "resolved short link");
        Ok(url)
    }

    /// Map `short` to `url` unless `short` is already taken
    ///
    /// The existence check and the write are a single `SET ... NX`, so two
    /// concurrent shortens of the same key cannot both succeed.
    pub async fn shorten(&self, short: &str, url: &str) -> Result<()> {
        let key = short.to_owned();
        let value = url.to_owned();
        let reply = with_client(&self.producer, &self.addr, move |client| {
            Box::pin(async move { client.exec(&Cmd::set_nx(key, value)).await })
        })
        .await?;

        if reply.is_null() {
            return Err(Error::ShortInUse(short.to_owned()));
        }
        reply.expect_ok()?;
        tracing::debug!(short, "stored short link");
        Ok(())
    }
}
