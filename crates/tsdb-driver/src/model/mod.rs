//! Wire records exchanged with the server.
//!
//! Plain serde structs; the only behavior is value validation on
//! [`DataPoint::new`] and typed views over query samples.

pub mod point;
pub mod query;
pub mod result;
pub mod version;

pub use point::{DataPoint, DataPointValue};
pub use query::{Aggregator, Filter, FilterType, MetricQuery, Query};
pub use result::{PutError, PutSummary, QueryResult};
pub use version::TsdbVersion;
