//! Error taxonomy for every driver operation.
//!
//! All failures funnel into [`DriverError`]. The retry loop never inspects
//! variants directly; it asks [`DriverError::kind`] for an [`ErrorKind`] and
//! retries exactly the kinds for which [`ErrorKind::is_retryable`] holds.
//!
//! - **Transient**: `Abnormal`, `Interrupted`, `Execution`,
//!   `MalformedResponse`, `InvalidArgument`, `Io`, `MalformedUri`.
//! - **Terminal**: `OverRetry`, wrapping the last transient failure.
//! - **Result-level**: `PutFailed`, where the HTTP call succeeded but the server
//!   rejected some points.
//! - **Value / config**: `InvalidValue`, `InvalidConfig`.
//! - **Lifecycle**: `TransportInit`, `NotRunning`, `ClusterClosed`.

use crate::model::{DataPoint, PutError};
use crate::status::HttpOutcome;
use crate::uri::Endpoint;

/// Crate-wide result alias.
pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// The `error` object of a non-success reply body.
///
/// Every field is optional: a body that is not JSON, or that lacks an
/// `error` object, yields an empty `ServerError`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub trace: Option<String>,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code={}, message={}",
            self.code.as_deref().unwrap_or("none"),
            self.message.as_deref().unwrap_or("none"),
        )
    }
}

/// Category tag of a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Abnormal,
    Interrupted,
    Execution,
    MalformedResponse,
    InvalidArgument,
    Io,
    MalformedUri,
    OverRetry,
    ResultLevel,
    InvalidValue,
    Lifecycle,
}

impl ErrorKind {
    /// Whether a failure of this kind consumes one retry unit and is attempted again.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Abnormal
                | ErrorKind::Interrupted
                | ErrorKind::Execution
                | ErrorKind::MalformedResponse
                | ErrorKind::InvalidArgument
                | ErrorKind::Io
                | ErrorKind::MalformedUri
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("server replied HTTP {status} ({outcome}): {error}")]
    Abnormal {
        status: u16,
        outcome: HttpOutcome,
        error: ServerError,
    },
    #[error("request interrupted: {0}")]
    Interrupted(String),
    #[error("request execution failed: {0}")]
    Execution(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("malformed uri: {0}")]
    MalformedUri(String),
    #[error("{endpoint} gave up after {attempts} attempts: {last}")]
    OverRetry {
        endpoint: Endpoint,
        attempts: u32,
        #[source]
        last: Box<DriverError>,
    },
    #[error("put rejected {} of {} points: {}", .errors.len(), .points.len(), summarize_put_errors(.errors))]
    PutFailed {
        errors: Vec<PutError>,
        points: Vec<DataPoint>,
    },
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("transport failed to start: {0}")]
    TransportInit(String),
    #[error("session is not running")]
    NotRunning,
    #[error("cluster is closed")]
    ClusterClosed,
}

fn summarize_put_errors(errors: &[PutError]) -> String {
    errors
        .iter()
        .map(|e| e.error.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Abnormal { .. } => ErrorKind::Abnormal,
            DriverError::Interrupted(_) => ErrorKind::Interrupted,
            DriverError::Execution(_) => ErrorKind::Execution,
            DriverError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            DriverError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DriverError::Io(_) => ErrorKind::Io,
            DriverError::MalformedUri(_) => ErrorKind::MalformedUri,
            DriverError::OverRetry { .. } => ErrorKind::OverRetry,
            DriverError::PutFailed { .. } => ErrorKind::ResultLevel,
            DriverError::InvalidValue(_) | DriverError::InvalidConfig(_) => ErrorKind::InvalidValue,
            DriverError::TransportInit(_) | DriverError::NotRunning | DriverError::ClusterClosed => {
                ErrorKind::Lifecycle
            }
        }
    }

    /// The failure that ended the call: itself, or the last attempt of an over-retry.
    pub fn last_failure(&self) -> &DriverError {
        match self {
            DriverError::OverRetry { last, .. } => last.last_failure(),
            other => other,
        }
    }

    /// HTTP status of the last abnormal reply, if the failure came from the server.
    pub fn status_code(&self) -> Option<u16> {
        match self.last_failure() {
            DriverError::Abnormal { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn server_error(&self) -> Option<&ServerError> {
        match self.last_failure() {
            DriverError::Abnormal { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Server-side error code from the reply body.
    pub fn server_code(&self) -> Option<&str> {
        self.server_error().and_then(|e| e.code.as_deref())
    }

    /// Server-side stack trace from the reply body.
    pub fn server_trace(&self) -> Option<&str> {
        self.server_error().and_then(|e| e.trace.as_deref())
    }

    /// Server-side message for abnormal replies; the error's own text otherwise.
    pub fn server_message(&self) -> Option<String> {
        match self.last_failure() {
            DriverError::Abnormal { error, .. } => error.message.clone(),
            other => Some(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            DriverError::InvalidArgument(e.to_string())
        } else if e.is_decode() || e.is_body() {
            DriverError::MalformedResponse(e.to_string())
        } else {
            DriverError::Io(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError::MalformedResponse(e.to_string())
    }
}

impl From<url::ParseError> for DriverError {
    fn from(e: url::ParseError) -> Self {
        DriverError::MalformedUri(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DriverError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            DriverError::Interrupted(e.to_string())
        } else {
            DriverError::Execution(e.to_string())
        }
    }
}
