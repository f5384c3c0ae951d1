//! Client facade
//!
//! This module handles:
//! * Building configured clients ([`ClientFactory`])
//! * The post-connect handshake ([`post_connect`])
//! * Command execution and release ([`StoreClient`])
//! * Scoped acquisition with guaranteed release ([`with_client`])

mod factory;
mod handshake;
mod store_client;

pub use factory::{with_client, ClientFactory, ClientProducer};
pub use handshake::post_connect;
pub use store_client::{Client, PooledClient, StoreClient};
