//! Driver configuration shared by a cluster and every session it spawns.
//!
//! # Examples
//!
//! Defaults only:
//!
//! ```
//! use tsdb_driver::Configuration;
//!
//! let config = Configuration::default();
//! assert_eq!(config.pool_size, 256);
//! ```
//!
//! Tuned with the builder methods:
//!
//! ```
//! use std::time::Duration;
//! use tsdb_driver::Configuration;
//!
//! let config = Configuration::default()
//!     .with_socket_timeout(Duration::from_secs(2))
//!     .with_put_retries(5)
//!     .with_sync_timeout(Duration::from_millis(500));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::{DriverError, Result};

/// Default port of the database's HTTP API.
pub const DEFAULT_PORT: u16 = 4242;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_millis(200);
pub const DEFAULT_POOL_SIZE: usize = 256;
pub const DEFAULT_MAX_ROUTE: usize = 32;
pub const DEFAULT_RETRIES: u32 = 3;

/// Immutable connection, pool and retry settings.
///
/// Wrap in an `Arc` once built; the cluster and its sessions only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Time allowed to establish a TCP connection. Default: 100ms.
    pub connect_timeout: Duration,
    /// Time allowed between reads on an established connection. Default: 200ms.
    pub socket_timeout: Duration,
    /// Idle connection lifetime. `None` leaves the HTTP client's default in
    /// place; `Some(Duration::ZERO)` disables connection reuse. Default: `Some(0)`.
    pub keep_alive: Option<Duration>,
    /// Maximum connections a session holds open at once, across hosts. Default: 256.
    pub pool_size: usize,
    /// Maximum connections a session holds open at once to one host, in use
    /// or idle. Sessions talk to a single host, so this is the effective
    /// concurrency cap. Must not exceed `pool_size`. Default: 32.
    pub max_route: usize,
    /// Worker threads of each session's I/O runtime. Default: available parallelism.
    pub io_threads: usize,
    /// Retry budget for query, delete and version calls; 0 disables retry. Default: 3.
    pub query_retries: u32,
    /// Retry budget for put calls; 0 disables retry. Default: 3.
    pub put_retries: u32,
    /// Server-side durability wait for sync puts; zero disables sync writes. Default: 0.
    pub sync_timeout: Duration,
    /// Talk `https` instead of `http`. Default: `false`.
    pub tls: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            keep_alive: Some(Duration::ZERO),
            pool_size: DEFAULT_POOL_SIZE,
            max_route: DEFAULT_MAX_ROUTE,
            io_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            query_retries: DEFAULT_RETRIES,
            put_retries: DEFAULT_RETRIES,
            sync_timeout: Duration::ZERO,
            tls: false,
        }
    }
}

impl Configuration {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Option<Duration>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_max_route(mut self, max_route: usize) -> Self {
        self.max_route = max_route;
        self
    }

    pub fn with_io_threads(mut self, io_threads: usize) -> Self {
        self.io_threads = io_threads;
        self
    }

    pub fn with_query_retries(mut self, retries: u32) -> Self {
        self.query_retries = retries;
        self
    }

    pub fn with_put_retries(mut self, retries: u32) -> Self {
        self.put_retries = retries;
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Whether puts asked to be synchronous actually wait for durability.
    pub fn sync_enabled(&self) -> bool {
        !self.sync_timeout.is_zero()
    }

    /// Reject settings the transport cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(DriverError::InvalidConfig("pool_size must be > 0".into()));
        }
        if self.max_route == 0 {
            return Err(DriverError::InvalidConfig("max_route must be > 0".into()));
        }
        if self.max_route > self.pool_size {
            return Err(DriverError::InvalidConfig(format!(
                "max_route ({}) exceeds pool_size ({})",
                self.max_route, self.pool_size
            )));
        }
        if self.io_threads == 0 {
            return Err(DriverError::InvalidConfig("io_threads must be > 0".into()));
        }
        if self.connect_timeout.is_zero() || self.socket_timeout.is_zero() {
            return Err(DriverError::InvalidConfig(
                "connect and socket timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
