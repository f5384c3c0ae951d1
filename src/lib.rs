//! shortkv: resilient key-value store client for a short-URL redirector
//!
//! shortkv establishes, secures, authenticates and configures a pool of
//! connections to a remote RESP store, then hands out a thin client over it.
//!
//! # Features
//!
//! * Mutual TLS with a private CA and optional server-name override
//! * ACL authentication on every connection, plus a dynamically injected
//!   replication secret
//! * Background reconnect with bounded exponential backoff
//! * A post-connect handshake that never leaves a half-configured client
//! * Per-call deadlines
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> shortkv::Result<()> {
//! use shortkv::{ClientFactory, LinkStore};
//!
//! let links = LinkStore::new(ClientFactory::from_env()?, shortkv::connection::DEFAULT_STORE_ADDR);
//! links.shorten("abc123", "https://example.com").await?;
//! assert_eq!(links.resolve("abc123").await?.as_deref(), Some("https://example.com"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod links;
pub mod metrics;
pub mod pool;
pub mod protocol;

pub use client::{with_client, Client, ClientFactory, ClientProducer, StoreClient};
pub use error::{Error, ErrorKind, Result};
pub use links::LinkStore;
