//! Endpoint URIs for the HTTP API.

use reqwest::Url;

use crate::error::Result;

/// An HTTP API operation and the path it is served under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Put,
    Query,
    QueryExp,
    QueryGexp,
    QueryLast,
    Delete,
    Version,
}

impl Endpoint {
    /// Path below `/api/`. Delete shares the query endpoint; the body carries `delete: true`.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Put => "put",
            Endpoint::Query | Endpoint::Delete => "query",
            Endpoint::QueryExp => "query/exp",
            Endpoint::QueryGexp => "query/gexp",
            Endpoint::QueryLast => "query/last",
            Endpoint::Version => "version",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Put => write!(f, "put"),
            Endpoint::Query => write!(f, "query"),
            Endpoint::QueryExp => write!(f, "query/exp"),
            Endpoint::QueryGexp => write!(f, "query/gexp"),
            Endpoint::QueryLast => write!(f, "query/last"),
            Endpoint::Delete => write!(f, "delete"),
            Endpoint::Version => write!(f, "version"),
        }
    }
}

/// Builds `scheme://host:port/api/<path>[?k=v&...]`.
///
/// The scheme is `https` when TLS is enabled. Query parameters keep the
/// order in which they were added.
#[derive(Debug, Clone)]
pub struct ApiUri<'a> {
    host: &'a str,
    port: u16,
    tls: bool,
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
}

impl<'a> ApiUri<'a> {
    pub fn new(host: &'a str, port: u16, tls: bool, endpoint: Endpoint) -> Self {
        Self {
            host,
            port,
            tls,
            endpoint,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    pub fn build(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}://{}:{}/api/{}",
            self.scheme(),
            self.host,
            self.port,
            self.endpoint.path()
        ))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
