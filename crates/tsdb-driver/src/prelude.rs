//! Convenience re-exports for common `tsdb-driver` types.
//!
//! ```
//! use tsdb_driver::prelude::*;
//! ```

// ── Lifecycle ───────────────────────────────────────────────────────
pub use crate::{Cluster, Configuration, Session};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::error::{DriverError, ErrorKind};

// ── Wire records ────────────────────────────────────────────────────
pub use crate::model::{
    Aggregator, DataPoint, DataPointValue, Filter, FilterType, MetricQuery, PutError, PutSummary,
    Query, QueryResult, TsdbVersion,
};
pub use crate::uri::Endpoint;
