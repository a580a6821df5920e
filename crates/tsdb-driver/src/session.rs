//! One logical connection to the database.
//!
//! A [`Session`] owns a [`Transport`] and runs each operation end to end:
//! build the endpoint URI, send the JSON body, classify the reply, and retry
//! transient failures within the configured budget.
//!
//! States: unstarted → running ([`Session::start`]) → closed
//! ([`Session::close`]). A closed session can be started again; that builds a
//! fresh transport.

use std::sync::{Arc, RwLock};

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::{DriverError, Result};
use crate::model::{DataPoint, PutSummary, Query, QueryResult, TsdbVersion};
use crate::retry::with_retries;
use crate::status::classify;
use crate::transport::{Transport, TsdbRequest, describe_keep_alive};
use crate::uri::{ApiUri, Endpoint};

pub struct Session {
    host: String,
    port: u16,
    config: Arc<Configuration>,
    transport: RwLock<Option<Arc<Transport>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Session {
    /// An unstarted session. Call [`start`](Self::start) before any operation.
    pub fn new(host: impl Into<String>, port: u16, config: Arc<Configuration>) -> Self {
        Self {
            host: host.into(),
            port,
            config,
            transport: RwLock::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Build and start the transport. No-op when already running.
    pub fn start(&self) -> Result<()> {
        self.config.validate()?;
        let mut slot = self.transport.write().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|t| t.is_running()) {
            return Ok(());
        }
        let transport = Transport::start(&self.config)?;
        *slot = Some(Arc::new(transport));
        info!(
            "Session started: {}:{} (keep-alive {})",
            self.host,
            self.port,
            describe_keep_alive(self.config.keep_alive)
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| t.is_running())
    }

    /// Stop the transport. Calls still in flight fail as `Interrupted`.
    pub fn close(&self) {
        let transport = self
            .transport
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(transport) = transport {
            transport.close();
            info!("Session closed: {}:{}", self.host, self.port);
        }
    }

    fn transport(&self) -> Result<Arc<Transport>> {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(DriverError::NotRunning)
    }

    fn uri(&self, endpoint: Endpoint) -> ApiUri<'_> {
        ApiUri::new(&self.host, self.port, self.config.tls, endpoint)
    }

    /// One attempt: POST, then classify.
    async fn post(&self, url: Url, body: &str) -> Result<String> {
        let transport = self.transport()?;
        let reply = transport.execute(TsdbRequest::post(url, body)).await?;
        classify(reply.status, reply.body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        uri: &ApiUri<'_>,
        body: &str,
        budget: u32,
    ) -> Result<T> {
        with_retries(endpoint, budget, || async move {
            let url = uri.build()?;
            let content = self.post(url, body).await?;
            Ok::<T, DriverError>(serde_json::from_str(&content)?)
        })
        .await
    }

    // ── Writes ────────────────────────────────────────────────────────

    /// Write `points`.
    ///
    /// `detailed` asks the server for per-point results. `sync` waits for
    /// durability, but only when a sync timeout is configured. A reply that
    /// reports failed points returns [`DriverError::PutFailed`] even though
    /// the HTTP call succeeded.
    pub async fn put(&self, points: &[DataPoint], sync: bool, detailed: bool) -> Result<PutSummary> {
        let body = serde_json::to_string(points)
            .map_err(|e| DriverError::InvalidValue(format!("unserializable data point: {e}")))?;

        let mut uri = self.uri(Endpoint::Put);
        if detailed {
            uri = uri.param("details", "true");
        }
        if sync && self.config.sync_enabled() {
            uri = uri
                .param("sync", "true")
                .param("timeout", self.config.sync_timeout.as_millis().to_string());
        }

        let uri = &uri;
        let body = body.as_str();
        let content = with_retries(Endpoint::Put, self.config.put_retries, || async move {
            let url = uri.build()?;
            self.post(url, body).await
        })
        .await?;

        let summary = if content.trim().is_empty() {
            PutSummary {
                success: points.len() as u64,
                ..PutSummary::default()
            }
        } else {
            serde_json::from_str::<PutSummary>(&content)?
        };
        debug!("Put {} points: success={}, failed={}", points.len(), summary.success, summary.failed);

        if summary.failed > 0 {
            return Err(DriverError::PutFailed {
                errors: summary.errors,
                points: points.to_vec(),
            });
        }
        Ok(summary)
    }

    /// Write one point; synchronous whenever a sync timeout is configured.
    pub async fn put_point(&self, point: DataPoint, detailed: bool) -> Result<PutSummary> {
        let sync = self.config.sync_enabled();
        self.put(std::slice::from_ref(&point), sync, detailed).await
    }

    // ── Reads ─────────────────────────────────────────────────────────

    /// Run `query` against one of the query endpoints.
    pub async fn query(&self, query: &Query, endpoint: Endpoint) -> Result<Vec<QueryResult>> {
        let body = serde_json::to_string(query)
            .map_err(|e| DriverError::InvalidValue(format!("unserializable query: {e}")))?;
        self.call(endpoint, &self.uri(endpoint), &body, self.config.query_retries)
            .await
    }

    pub async fn query_exp(&self, query: &Query) -> Result<Vec<QueryResult>> {
        self.query(query, Endpoint::QueryExp).await
    }

    pub async fn query_gexp(&self, query: &Query) -> Result<Vec<QueryResult>> {
        self.query(query, Endpoint::QueryGexp).await
    }

    pub async fn query_last(&self, query: &Query) -> Result<Vec<QueryResult>> {
        self.query(query, Endpoint::QueryLast).await
    }

    /// Delete the points `query` selects. Sets `query.delete` first.
    pub async fn delete(&self, query: &mut Query) -> Result<Vec<QueryResult>> {
        query.delete = true;
        self.query(query, Endpoint::Delete).await
    }

    /// Server release line. An unrecognized or missing version string is
    /// [`TsdbVersion::Unknown`], not an error.
    pub async fn version(&self) -> Result<TsdbVersion> {
        let uri = self.uri(Endpoint::Version);
        let uri = &uri;
        let content = with_retries(Endpoint::Version, self.config.query_retries, || async move {
            let url = uri.build()?;
            self.post(url, "").await
        })
        .await?;
        Ok(TsdbVersion::from_reply(&content))
    }
}
