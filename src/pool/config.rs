//! Pool configuration

use crate::{Error, Result};
use std::time::Duration;

/// Connections per pool; the redirector runs against a single low-traffic replica
pub const POOL_SIZE: usize = 1;

/// Shortest delay before a dropped connection is re-dialed
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_millis(125);

/// Longest delay between reconnect attempts
pub const MAX_RECONNECT_INTERVAL: Duration = Duration::from_secs(4);

/// Sizing, liveness and reconnect parameters of a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of connections kept open
    pub size: usize,
    /// Liveness ping period; `None` disables pinging
    pub ping_interval: Option<Duration>,
    /// First reconnect delay after a connection drops
    pub min_reconnect_interval: Duration,
    /// Cap on the reconnect delay
    pub max_reconnect_interval: Duration,
    /// Bound on building the initial connections
    pub init_timeout: Duration,
}

impl PoolConfig {
    /// Defaults with the given construction timeout
    ///
    /// The factory derives `init_timeout` from the dial connect timeout.
    pub fn new(init_timeout: Duration) -> Self {
        Self {
            size: POOL_SIZE,
            ping_interval: None,
            min_reconnect_interval: MIN_RECONNECT_INTERVAL,
            max_reconnect_interval: MAX_RECONNECT_INTERVAL,
            init_timeout,
        }
    }

    /// Set the number of connections
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Enable periodic liveness pings
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = Some(interval);
        self
    }

    /// Set reconnect backoff bounds
    pub fn reconnect_interval(mut self, min: Duration, max: Duration) -> Self {
        self.min_reconnect_interval = min;
        self.max_reconnect_interval = max;
        self
    }

    /// Set the construction timeout
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Reject configurations the pool cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::Config("pool size must be at least 1".into()));
        }
        if self.min_reconnect_interval.is_zero() {
            return Err(Error::Config("minimum reconnect interval must be non-zero".into()));
        }
        if self.max_reconnect_interval < self.min_reconnect_interval {
            return Err(Error::Config(format!(
                "maximum reconnect interval {:?} is below minimum {:?}",
                self.max_reconnect_interval, self.min_reconnect_interval
            )));
        }
        if self.ping_interval.is_some_and(|p| p.is_zero()) {
            return Err(Error::Config("ping interval must be non-zero".into()));
        }
        if self.init_timeout.is_zero() {
            return Err(Error::Config("pool init timeout must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(crate::connection::DEFAULT_CONNECT_TIMEOUT)
    }
}
