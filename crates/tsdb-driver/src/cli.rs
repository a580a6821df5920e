//! Command-line flags shared by the `tsdb` and `tsdb-stress` binaries.

use std::time::Duration;

use clap::Args;

use crate::config::{
    Configuration, DEFAULT_MAX_ROUTE, DEFAULT_POOL_SIZE, DEFAULT_PORT, DEFAULT_RETRIES,
};

/// Endpoint and [`Configuration`] flags.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Database host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Database HTTP API port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    // ── Timeouts ───────────────────────────────────────────────
    /// TCP connect timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds
    #[arg(long, default_value_t = 200)]
    pub socket_timeout_ms: u64,

    /// Idle connection lifetime in milliseconds (0 = never reuse; omit for the client default)
    #[arg(long)]
    pub keep_alive_ms: Option<u64>,

    /// Durability wait for sync puts in milliseconds (0 = disabled)
    #[arg(long, default_value_t = 0)]
    pub sync_timeout_ms: u64,

    // ── Pool ───────────────────────────────────────────────────
    /// Maximum open connections across hosts
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    /// Maximum open connections to the host (caps concurrent requests)
    #[arg(long, default_value_t = DEFAULT_MAX_ROUTE)]
    pub max_route: usize,

    /// I/O worker threads per session (default: available parallelism)
    #[arg(long)]
    pub io_threads: Option<usize>,

    // ── Retry ──────────────────────────────────────────────────
    /// Attempts per put call (0 = no retry)
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    pub put_retries: u32,

    /// Attempts per query, delete or version call (0 = no retry)
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    pub query_retries: u32,

    /// Use https
    #[arg(long)]
    pub tls: bool,
}

impl ConnectionArgs {
    pub fn configuration(&self) -> Configuration {
        let mut config = Configuration::default()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_socket_timeout(Duration::from_millis(self.socket_timeout_ms))
            .with_sync_timeout(Duration::from_millis(self.sync_timeout_ms))
            .with_pool_size(self.pool_size)
            .with_max_route(self.max_route)
            .with_put_retries(self.put_retries)
            .with_query_retries(self.query_retries)
            .with_tls(self.tls);
        if let Some(ms) = self.keep_alive_ms {
            config = config.with_keep_alive(Some(Duration::from_millis(ms)));
        }
        if let Some(threads) = self.io_threads {
            config = config.with_io_threads(threads);
        }
        config
    }
}

/// Install the process-wide `tracing` subscriber: fmt to stderr, filtered by
/// `RUST_LOG` (default `info`).
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
