//! Pooled HTTP/JSON client driver for OpenTSDB-compatible time-series databases.
//!
//! A [`Cluster`] is the entry point: it holds the endpoint and the shared
//! [`Configuration`], hands out [`Session`]s, and tears them all down on
//! close. Each session owns one pooled HTTP transport and exposes the
//! database operations (`put`, `query`, `query/exp`, `query/gexp`,
//! `query/last`, delete, `version`) with a bounded retry policy around every
//! remote call.
//!
//! # Getting started
//!
//! ```no_run
//! use tsdb_driver::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> tsdb_driver::Result<()> {
//!     let cluster = Cluster::new("127.0.0.1", 4242, Configuration::default())?;
//!     let session = cluster.connect()?;
//!
//!     let point = DataPoint::new("sys.cpu.user", 1_700_000_000, 42.5)?
//!         .with_tag("host", "web01");
//!     let summary = session.put(&[point], false, true).await?;
//!     println!("stored {} points", summary.success);
//!
//!     let query = Query::new(1_700_000_000)
//!         .with_metric(MetricQuery::new(Aggregator::Sum, "sys.cpu.user"));
//!     for series in session.query(&query, Endpoint::Query).await? {
//!         println!("{} {:?}", series.metric, series.double_dps());
//!     }
//!
//!     cluster.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cli` | Shared `clap` connection flags and subscriber setup for the binaries (feature `cli`) |
//! | [`cluster`] | [`Cluster`]: master session, session registry, lifecycle |
//! | [`session`] | [`Session`]: put / query / delete / version with retry |
//! | [`transport`] | Pooled `reqwest` client on a dedicated I/O runtime |
//! | [`retry`] | Attempt-counting retry loop |
//! | [`status`] | HTTP status → [`HttpOutcome`](status::HttpOutcome) classification |
//! | [`uri`] | [`Endpoint`] paths and URI building |
//! | [`config`] | [`Configuration`] defaults, builder methods, validation |
//! | [`error`] | [`DriverError`] taxonomy |
//! | [`model`] | Data points, queries and reply records |
//!
//! # Failures
//!
//! Transient failures (abnormal HTTP status, I/O, malformed replies and the
//! like) are retried up to the configured budget and then surface as
//! [`DriverError::OverRetry`], which keeps the last failure's status code and
//! server diagnostics. A put whose reply reports rejected points surfaces as
//! [`DriverError::PutFailed`] without retry. See [`error`] for the full list.
//!
//! The library logs through `tracing` and never installs a subscriber. The
//! `cli` feature (on by default) adds the flag and subscriber helpers the
//! binaries share; library users can turn it off to drop `clap` and
//! `tracing-subscriber`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod model;
pub mod prelude;
pub mod retry;
pub mod session;
pub mod status;
pub mod transport;
pub mod uri;

pub use cluster::Cluster;
pub use config::{Configuration, DEFAULT_PORT};
pub use error::{DriverError, ErrorKind, Result, ServerError};
pub use session::Session;
pub use uri::Endpoint;
