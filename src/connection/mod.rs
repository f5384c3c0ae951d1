//! Connection management
//!
//! This module handles:
//! * Connection options (TLS material, ACL credentials, dial timeouts)
//! * Transport abstraction (plain TCP vs TLS)
//! * Connection lifecycle (connect, TLS, auth, request/reply)
//! * State machine enforcement

mod addr;
mod conn;
mod dialer;
mod options;
mod state;
mod tls;
mod transport;

pub use addr::split_host_port;
pub use conn::Connection;
pub use dialer::Dialer;
pub use options::{
    ConnectionOptions, ConnectionOptionsBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
    DEFAULT_STORE_ADDR, DEFAULT_WRITE_TIMEOUT,
};
pub use state::ConnectionState;
pub use tls::TrustBundle;
pub use transport::Transport;
