//! Error types for the clinic API client.
//!
//! # Design
//! Every failure that reaches a caller is an [`ApiError`], one of exactly
//! three cases: the server answered with an error status, no answer arrived,
//! or the request never left the process. Transports report raw failures as
//! [`TransportError`]; [`normalize`] folds those and non-2xx responses into
//! the three cases. Entity factories report [`ValidationError`], which lands
//! in `LocalFault` since a malformed record is treated as a local fault.

use reqwest::StatusCode;
use thiserror::Error;

use crate::http::HttpResponse;

/// Normalized failure returned by every client operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The backend responded with a non-2xx status.
    #[error("server rejected request: {status} {status_text}")]
    ServerRejected {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request was sent but no response arrived (timeout, reset, DNS).
    #[error("no response from server: {reason}")]
    NoResponse { reason: String },

    /// The request could not be constructed, or its result could not be used.
    #[error("{message}")]
    LocalFault { message: String },
}

impl ApiError {
    pub fn local(message: impl Into<String>) -> Self {
        ApiError::LocalFault {
            message: message.into(),
        }
    }

    /// Build a `ServerRejected` from a response carrying an error status.
    pub fn rejected(response: &HttpResponse) -> Self {
        let status_text = StatusCode::from_u16(response.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        ApiError::ServerRejected {
            status: response.status,
            status_text,
            body: response.body.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the session is no longer accepted and the user should sign in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Raw failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be built or dispatched (bad URL, bad header).
    #[error("request could not be sent: {0}")]
    Unsent(String),

    /// The request went out but the response never arrived in full.
    #[error("no response: {0}")]
    NoResponse(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unsent(message) => ApiError::LocalFault { message },
            TransportError::NoResponse(reason) => ApiError::NoResponse { reason },
        }
    }
}

/// Structural problem with a record returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{resource}: required field `{field}` is missing")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    #[error("{resource}: `{field}` is not a valid timestamp: {value:?}")]
    InvalidTimestamp {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{resource}: {reason}")]
    Invariant {
        resource: &'static str,
        reason: String,
    },

    #[error("list envelope holds {results} references but reports count {count}")]
    CountMismatch { count: u64, results: usize },

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::local(err.to_string())
    }
}

/// Fatal configuration problem detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Classify the outcome of one transport round-trip.
///
/// 2xx responses pass through untouched; everything else becomes an
/// [`ApiError`]. The mapping depends only on the input, so the same failure
/// always yields the same case.
pub fn normalize(outcome: Result<HttpResponse, TransportError>) -> Result<HttpResponse, ApiError> {
    match outcome {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(ApiError::rejected(&response)),
        Err(err) => Err(err.into()),
    }
}
