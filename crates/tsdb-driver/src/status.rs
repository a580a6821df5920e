//! Response classification: HTTP status code → semantic outcome.
//!
//! Only [`HttpOutcome::Success`] hands the body back to the caller. Every
//! other outcome, including the non-200 2xx codes, becomes
//! [`DriverError::Abnormal`] carrying whatever `error` object the body holds.

use serde::Deserialize;

use crate::error::{DriverError, Result, ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpOutcome {
    /// 200
    Success,
    /// 202
    AcceptedIncomplete,
    /// 204
    SuccessNoContent,
    /// 205
    ResetContent,
    /// 206
    PartialContent,
    /// 300-399
    NeedsMoreProcessing,
    /// 400-499
    ClientError,
    /// 500-599
    ServerError,
    /// 600-699
    OtherError,
    Unknown,
}

impl HttpOutcome {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => HttpOutcome::Success,
            202 => HttpOutcome::AcceptedIncomplete,
            204 => HttpOutcome::SuccessNoContent,
            205 => HttpOutcome::ResetContent,
            206 => HttpOutcome::PartialContent,
            300..=399 => HttpOutcome::NeedsMoreProcessing,
            400..=499 => HttpOutcome::ClientError,
            500..=599 => HttpOutcome::ServerError,
            600..=699 => HttpOutcome::OtherError,
            _ => HttpOutcome::Unknown,
        }
    }

    pub fn is_success(self) -> bool {
        self == HttpOutcome::Success
    }
}

impl std::fmt::Display for HttpOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpOutcome::Success => "success",
            HttpOutcome::AcceptedIncomplete => "accepted_incomplete",
            HttpOutcome::SuccessNoContent => "success_no_content",
            HttpOutcome::ResetContent => "reset_content",
            HttpOutcome::PartialContent => "partial_content",
            HttpOutcome::NeedsMoreProcessing => "needs_more_processing",
            HttpOutcome::ClientError => "client_error",
            HttpOutcome::ServerError => "server_error",
            HttpOutcome::OtherError => "other_error",
            HttpOutcome::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<RawServerError>,
}

#[derive(Deserialize)]
struct RawServerError {
    code: Option<serde_json::Value>,
    message: Option<String>,
    trace: Option<String>,
}

/// Scalar JSON values as text; servers send the code as a number or a string.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Pull `error.{code,message,trace}` out of a reply body. Never fails.
pub fn parse_server_error(body: &str) -> ServerError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return ServerError::default();
    };
    match envelope.error {
        Some(raw) => ServerError {
            code: raw.code.and_then(scalar_to_string),
            message: raw.message,
            trace: raw.trace,
        },
        None => ServerError::default(),
    }
}

/// Classify a reply. Success yields the body verbatim.
pub fn classify(status: u16, body: String) -> Result<String> {
    let outcome = HttpOutcome::from_code(status);
    if outcome.is_success() {
        return Ok(body);
    }
    Err(DriverError::Abnormal {
        status,
        outcome,
        error: parse_server_error(&body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn individual_2xx_codes() {
        assert_eq!(HttpOutcome::from_code(200), HttpOutcome::Success);
        assert_eq!(HttpOutcome::from_code(202), HttpOutcome::AcceptedIncomplete);
        assert_eq!(HttpOutcome::from_code(204), HttpOutcome::SuccessNoContent);
        assert_eq!(HttpOutcome::from_code(205), HttpOutcome::ResetContent);
        assert_eq!(HttpOutcome::from_code(206), HttpOutcome::PartialContent);
    }

    #[test]
    fn ranges() {
        for code in 300..400 {
            assert_eq!(HttpOutcome::from_code(code), HttpOutcome::NeedsMoreProcessing);
        }
        for code in 400..500 {
            assert_eq!(HttpOutcome::from_code(code), HttpOutcome::ClientError);
        }
        for code in 500..600 {
            assert_eq!(HttpOutcome::from_code(code), HttpOutcome::ServerError);
        }
        for code in 600..700 {
            assert_eq!(HttpOutcome::from_code(code), HttpOutcome::OtherError);
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        for code in [0, 100, 199, 201, 203, 207, 299, 700, 999, u16::MAX] {
            assert_eq!(HttpOutcome::from_code(code), HttpOutcome::Unknown, "code {code}");
        }
    }

    #[test]
    fn success_returns_body_verbatim() {
        let body = r#"{"success":1,"failed":0,"errors":[]}"#.to_string();
        assert_eq!(classify(200, body.clone()).unwrap(), body);
    }

    #[test]
    fn error_body_fields_are_extracted() {
        let body = r#"{"error":{"code":400,"message":"Unknown metric","trace":"at UniqueId"}}"#;
        let err = classify(400, body.to_string()).unwrap_err();
        match err {
            DriverError::Abnormal {
                status,
                outcome,
                error,
            } => {
                assert_eq!(status, 400);
                assert_eq!(outcome, HttpOutcome::ClientError);
                assert_eq!(error.code.as_deref(), Some("400"));
                assert_eq!(error.message.as_deref(), Some("Unknown metric"));
                assert_eq!(error.trace.as_deref(), Some("at UniqueId"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_conforming_body_yields_empty_fields() {
        for body in ["", "<html>502 Bad Gateway</html>", r#"{"other":1}"#, "[]"] {
            let err = classify(502, body.to_string()).unwrap_err();
            assert!(
                matches!(&err, DriverError::Abnormal { error, .. } if *error == ServerError::default()),
                "body {body:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn no_content_is_not_success() {
        let err = classify(204, String::new()).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Abnormal {
                outcome: HttpOutcome::SuccessNoContent,
                ..
            }
        ));
    }
}
