//! Reply payloads of put and query calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of a `/api/put` call made with `details`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PutSummary {
    pub success: u64,
    pub failed: u64,
    #[serde(default)]
    pub errors: Vec<PutError>,
}

/// One rejected point and the server's reason.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PutError {
    /// Echo of the rejected point, as the server serialized it.
    #[serde(default)]
    pub datapoint: serde_json::Value,
    #[serde(default)]
    pub error: String,
}

/// One series in a query reply.
///
/// `query/last` replies carry a single `timestamp`/`value` pair instead of
/// `dps`; both shapes deserialize into this record.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub aggregate_tags: Vec<String>,
    #[serde(default)]
    pub dps: BTreeMap<i64, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<serde_json::Value>,
}

/// Numeric view of a sample; servers encode some values as strings.
fn as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl QueryResult {
    /// Samples as floats, ordered by timestamp. Non-numeric samples are skipped.
    pub fn double_dps(&self) -> BTreeMap<i64, f64> {
        self.dps
            .iter()
            .filter_map(|(ts, v)| as_f64(v).map(|f| (*ts, f)))
            .collect()
    }

    /// Samples truncated to integers, ordered by timestamp.
    pub fn long_dps(&self) -> BTreeMap<i64, i64> {
        self.dps
            .iter()
            .filter_map(|(ts, v)| {
                let int = match v {
                    serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
                    other => as_f64(other).map(|f| f as i64),
                };
                int.map(|i| (*ts, i))
            })
            .collect()
    }

    /// The single sample of a `query/last` reply.
    pub fn last_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(as_f64)
    }
}
