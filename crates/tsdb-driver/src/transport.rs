//! One pooled HTTP client plus the I/O runtime that drives it.
//!
//! Each transport owns a dedicated multi-thread tokio runtime with
//! `io_threads` workers. Requests are spawned onto that runtime and awaited
//! by the caller, so connection pooling, DNS and socket work never run on the
//! caller's executor. Closing the transport shuts the runtime down in the
//! background, which is safe from inside async code.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::config::Configuration;
use crate::error::{DriverError, Result};

/// A request ready to send.
#[derive(Debug, Clone)]
pub struct TsdbRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
}

impl TsdbRequest {
    /// POST with a JSON body; an empty body is sent without a content type.
    pub fn post(url: Url, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            method: Method::POST,
            url,
            body: (!body.is_empty()).then_some(body),
        }
    }
}

/// Status and body of a reply, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub struct Transport {
    client: Client,
    /// One per connection allowed in use at once. A transport only talks to
    /// one host, so this is the smaller of `pool_size` and `max_route`.
    permits: Arc<Semaphore>,
    /// Longest wait for a free permit.
    acquire_timeout: Duration,
    runtime: Mutex<Option<Runtime>>,
}

impl Transport {
    /// Build the runtime and client. The transport is running on return.
    pub fn start(config: &Configuration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.io_threads)
            .thread_name("tsdb-io")
            .enable_all()
            .build()
            .map_err(|e| DriverError::TransportInit(format!("failed to build I/O runtime: {e}")))?;

        let client = build_client(config)?;
        let connections = max_connections(config);
        debug!(
            "Transport started: io_threads={}, connections={} (pool_size={}, max_route={}), keep_alive={}",
            config.io_threads,
            connections,
            config.pool_size,
            config.max_route,
            describe_keep_alive(config.keep_alive)
        );

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(connections)),
            acquire_timeout: config.connect_timeout,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Stop the I/O runtime. In-flight requests resolve as `Interrupted`.
    /// Closing a closed transport is a no-op.
    pub fn close(&self) {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(runtime) = runtime {
            self.permits.close();
            runtime.shutdown_background();
            debug!("Transport closed");
        }
    }

    /// Send one request and read the whole reply body.
    ///
    /// The only suspension point of a driver call. Waiting for a free
    /// connection is bounded by the connect timeout, after which the call
    /// fails with `Io`; the request itself is bounded by the connect and
    /// socket timeouts.
    pub async fn execute(&self, request: TsdbRequest) -> Result<RawResponse> {
        let handle = {
            let guard = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_ref() {
                Some(runtime) => runtime.handle().clone(),
                None => return Err(DriverError::NotRunning),
            }
        };

        let permit = tokio::time::timeout(self.acquire_timeout, Arc::clone(&self.permits).acquire_owned())
            .await
            .map_err(|_| {
                DriverError::Io(format!(
                    "no free connection after {}ms",
                    self.acquire_timeout.as_millis()
                ))
            })?
            .map_err(|_| DriverError::Interrupted("transport closed while waiting for a connection".into()))?;

        let client = self.client.clone();
        let task = handle.spawn(async move {
            let _permit = permit;
            send(client, request).await
        });
        task.await?
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn send(client: Client, request: TsdbRequest) -> Result<RawResponse> {
    let start = Instant::now();
    let method = request.method.clone();
    let url = request.url.clone();

    let mut builder = client.request(request.method, request.url);
    if let Some(body) = request.body {
        trace!("Request payload size: {} bytes", body.len());
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let resp = builder.send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;

    debug!(
        "{} {} -> HTTP {} in {:.1}ms ({} bytes)",
        method,
        url,
        status,
        start.elapsed().as_secs_f64() * 1000.0,
        body.len()
    );
    Ok(RawResponse { status, body })
}

/// Connections a transport may hold open at once.
fn max_connections(config: &Configuration) -> usize {
    config.pool_size.min(config.max_route)
}

fn build_client(config: &Configuration) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("tsdb-driver/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.socket_timeout)
        .pool_max_idle_per_host(config.max_route);

    builder = match config.keep_alive {
        Some(d) if d.is_zero() => builder.pool_max_idle_per_host(0),
        Some(d) => builder.pool_idle_timeout(d),
        None => builder,
    };

    builder
        .build()
        .map_err(|e| DriverError::TransportInit(format!("failed to build HTTP client: {e}")))
}

/// Keep-alive period the client was configured with, for diagnostics.
pub fn describe_keep_alive(keep_alive: Option<Duration>) -> String {
    match keep_alive {
        None => "engine default".to_string(),
        Some(d) if d.is_zero() => "disabled".to_string(),
        Some(d) => format!("{}ms", d.as_millis()),
    }
}
