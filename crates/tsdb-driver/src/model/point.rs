//! Data points written through `/api/put`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

/// Numeric value of a data point. Serialized as a bare JSON number.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(untagged)]
pub enum DataPointValue {
    Integer(i64),
    Float(f64),
}

impl From<i64> for DataPointValue {
    fn from(v: i64) -> Self {
        DataPointValue::Integer(v)
    }
}

impl From<i32> for DataPointValue {
    fn from(v: i32) -> Self {
        DataPointValue::Integer(v.into())
    }
}

impl From<f64> for DataPointValue {
    fn from(v: f64) -> Self {
        DataPointValue::Float(v)
    }
}

impl From<f32> for DataPointValue {
    fn from(v: f32) -> Self {
        DataPointValue::Float(v.into())
    }
}

impl TryFrom<serde_json::Value> for DataPointValue {
    type Error = DriverError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(DataPointValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(DataPointValue::Float(f))
                } else {
                    Err(DriverError::InvalidValue(format!("{n} does not fit i64 or f64")))
                }
            }
            other => Err(DriverError::InvalidValue(format!(
                "data point value must be an integer or float, got {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DataPointValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataPointValue::Integer(v) => write!(f, "{v}"),
            DataPointValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One sample of one time series.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub metric: String,
    /// Seconds or milliseconds since the epoch; the server infers which.
    pub timestamp: i64,
    pub value: DataPointValue,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tsuid: Option<String>,
}

impl DataPoint {
    /// Fails on an empty metric name or a NaN/infinite value.
    pub fn new(
        metric: impl Into<String>,
        timestamp: i64,
        value: impl Into<DataPointValue>,
    ) -> Result<Self> {
        let metric = metric.into();
        let value = value.into();
        if metric.is_empty() {
            return Err(DriverError::InvalidValue("metric name is empty".into()));
        }
        if let DataPointValue::Float(f) = value
            && !f.is_finite()
        {
            return Err(DriverError::InvalidValue(format!(
                "{metric}: value {f} is not finite"
            )));
        }
        Ok(Self {
            metric,
            timestamp,
            value,
            tags: BTreeMap::new(),
            tsuid: None,
        })
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = (String, String)>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// An empty tsuid is treated as absent.
    pub fn with_tsuid(mut self, tsuid: impl Into<String>) -> Self {
        let tsuid = tsuid.into();
        self.tsuid = (!tsuid.is_empty()).then_some(tsuid);
        self
    }
}

impl std::fmt::Display for DataPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric, self.timestamp, self.value)?;
        for (k, v) in &self.tags {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}
