//! Query bodies for the `/api/query` family of endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Downsampling and grouping functions understood by the server.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    Sum,
    Min,
    Max,
    Avg,
    Dev,
    Count,
    None,
    First,
    Last,
    Zimsum,
    Mimmin,
    Mimmax,
    P50,
    P75,
    P90,
    P95,
    P99,
    P999,
}

/// Tag filter kinds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    LiteralOr,
    IliteralOr,
    NotLiteralOr,
    NotIliteralOr,
    Wildcard,
    Iwildcard,
    Regexp,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub tagk: String,
    pub filter: String,
    #[serde(default)]
    pub group_by: bool,
}

impl Filter {
    pub fn new(filter_type: FilterType, tagk: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            filter_type,
            tagk: tagk.into(),
            filter: filter.into(),
            group_by: false,
        }
    }

    pub fn with_group_by(mut self, group_by: bool) -> Self {
        self.group_by = group_by;
        self
    }
}

/// One metric selection inside a [`Query`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub aggregator: Aggregator,
    pub metric: String,
    #[serde(default)]
    pub rate: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub downsample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explicit_tags: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub filters: Vec<Filter>,
}

impl MetricQuery {
    pub fn new(aggregator: Aggregator, metric: impl Into<String>) -> Self {
        Self {
            aggregator,
            metric: metric.into(),
            rate: false,
            downsample: None,
            explicit_tags: None,
            tags: BTreeMap::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: bool) -> Self {
        self.rate = rate;
        self
    }

    /// e.g. `"5m-avg"`.
    pub fn with_downsample(mut self, downsample: impl Into<String>) -> Self {
        self.downsample = Some(downsample.into());
        self
    }

    pub fn with_explicit_tags(mut self, explicit: bool) -> Self {
        self.explicit_tags = Some(explicit);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A time-range query over one or more metrics.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub start: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub no_annotations: bool,
    #[serde(default)]
    pub global_annotations: bool,
    #[serde(default)]
    pub ms_resolution: bool,
    #[serde(rename = "showTSUIDs", default)]
    pub show_tsuids: bool,
    #[serde(default)]
    pub show_summary: bool,
    #[serde(default)]
    pub show_stats: bool,
    #[serde(default)]
    pub show_query: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub use_calendar: bool,
    pub queries: Vec<MetricQuery>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Query {
    /// A query from `start` up to now (milliseconds).
    pub fn new(start: i64) -> Self {
        Self {
            start,
            end: Some(chrono::Utc::now().timestamp_millis()),
            no_annotations: false,
            global_annotations: false,
            ms_resolution: false,
            show_tsuids: false,
            show_summary: false,
            show_stats: false,
            show_query: false,
            delete: false,
            timezone: default_timezone(),
            use_calendar: false,
            queries: Vec::new(),
        }
    }

    /// `None` leaves the end open; the server substitutes its current time.
    pub fn with_end(mut self, end: Option<i64>) -> Self {
        self.end = end;
        self
    }

    pub fn with_metric(mut self, query: MetricQuery) -> Self {
        self.queries.push(query);
        self
    }

    pub fn with_metrics(mut self, queries: impl IntoIterator<Item = MetricQuery>) -> Self {
        self.queries.extend(queries);
        self
    }

    pub fn with_ms_resolution(mut self, ms: bool) -> Self {
        self.ms_resolution = ms;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_annotations(mut self, annotations: bool, global: bool) -> Self {
        self.no_annotations = !annotations;
        self.global_annotations = global;
        self
    }

    pub fn with_diagnostics(mut self, summary: bool, stats: bool, query: bool) -> Self {
        self.show_summary = summary;
        self.show_stats = stats;
        self.show_query = query;
        self
    }

    pub fn with_tsuids(mut self, show: bool) -> Self {
        self.show_tsuids = show;
        self
    }

    pub fn with_calendar(mut self, use_calendar: bool) -> Self {
        self.use_calendar = use_calendar;
        self
    }
}
