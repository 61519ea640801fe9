//! Domain error shape and the transport-to-domain translator
//!
//! Every failure that leaves the pipeline is a [`DomainError`]: a message
//! fit for display, the HTTP status when there was a response, and the
//! server's detail string when it sent one. Callers render it; they never
//! see `reqwest` errors.

use std::collections::BTreeMap;

use serde_json::Value;
use session_auth::GENERIC_ERROR_MESSAGE;

/// Failure taxonomy used for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401 from login or refresh: wrong credentials, not an expired session
    CredentialRejected,
    /// 401 that could not be recovered by a refresh
    SessionExpired,
    /// No response received (connect failure, timeout, reset)
    TransientNetwork,
    /// Other 4xx
    Validation,
    /// 5xx, or a success body that could not be decoded
    Server,
}

impl ErrorKind {
    /// Default classification for an HTTP status (or its absence).
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => ErrorKind::TransientNetwork,
            Some(401) => ErrorKind::SessionExpired,
            Some(400..=499) => ErrorKind::Validation,
            Some(_) => ErrorKind::Server,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::CredentialRejected => "credential_rejected",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
        }
    }
}

/// Normalized failure returned to callers.
///
/// Immutable once built; holds no reference to the transport error it came
/// from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    details: Option<Vec<String>>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    pub fn with_status(self, status: u16) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    /// Same error, reclassified.
    pub fn with_kind(self, kind: ErrorKind) -> Self {
        Self { kind, ..self }
    }

    /// Translate a `reqwest` error raised before any response was read.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        let transport_message = if error.is_timeout() {
            format!("Request timeout: {error}")
        } else if error.is_connect() {
            format!("Network Error: {error}")
        } else {
            error.to_string()
        };
        translate(&TransportFailure {
            status: error.status().map(|s| s.as_u16()),
            body: None,
            transport_message: Some(&transport_message),
        })
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn details(&self) -> Option<&[String]> {
        self.details.as_deref()
    }

    /// Message suitable for showing to an end user.
    ///
    /// Status-specific wording takes precedence over server text, except
    /// for 401 where the server usually explains the login failure.
    pub fn user_message(&self) -> &str {
        match self.status {
            Some(400) => messages::VALIDATION,
            Some(401) if !self.message.is_empty() && self.message != "Unauthorized" => {
                &self.message
            }
            Some(401) => messages::UNAUTHORIZED,
            Some(403) => messages::FORBIDDEN,
            Some(404) => messages::UNAVAILABLE,
            Some(429) => messages::RATE_LIMIT,
            Some(500 | 502 | 503 | 504) => messages::SERVER,
            Some(_) if !self.message.is_empty() && !self.message.contains("status code") => {
                &self.message
            }
            Some(_) => messages::NETWORK,
            None if self.message.contains("Network Error")
                || self.message.contains("Connection refused") =>
            {
                messages::NETWORK
            }
            None if self.message.to_lowercase().contains("timeout") => messages::TIMEOUT,
            None if self.message.contains("status code") => messages::SERVER,
            None => &self.message,
        }
    }

    /// Per-field messages from `details` entries shaped `field: message`.
    ///
    /// Returns `None` when no entry has that shape.
    pub fn field_errors(&self) -> Option<BTreeMap<String, String>> {
        let fields: BTreeMap<String, String> = self
            .details
            .iter()
            .flatten()
            .filter_map(|detail| split_field_detail(detail))
            .map(|(field, message)| (field.to_string(), message.to_string()))
            .collect();
        (!fields.is_empty()).then_some(fields)
    }
}

impl From<session_auth::Error> for DomainError {
    fn from(error: session_auth::Error) -> Self {
        match &error {
            session_auth::Error::Rejected { status, body } => {
                let transport_message = format!("Request failed with status code {status}");
                translate(&TransportFailure {
                    status: Some(*status),
                    body: Some(body.as_bytes()),
                    transport_message: Some(&transport_message),
                })
            }
            session_auth::Error::Http(message) => {
                DomainError::new(ErrorKind::TransientNetwork, message.clone())
            }
            session_auth::Error::TokenExchange(message) => {
                DomainError::new(ErrorKind::Server, message.clone())
            }
            session_auth::Error::NoSession(message) => {
                DomainError::new(ErrorKind::SessionExpired, message.clone())
            }
        }
    }
}

/// Errors building an [`ApiClient`](crate::ApiClient).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header name: {0}")]
    InvalidHeader(String),

    #[error("HTTP client construction failed: {0}")]
    Http(String),
}

/// A failed exchange, before translation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportFailure<'a> {
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Raw response body, when one was read
    pub body: Option<&'a [u8]>,
    /// The transport layer's own description of the failure
    pub transport_message: Option<&'a str>,
}

/// Map a raw failure to a [`DomainError`].
///
/// Message priority, first non-empty wins:
/// 1. body `details`: the string, or the first element of a string array
/// 2. body `message`
/// 3. body `error`
/// 4. the transport message
/// 5. [`GENERIC_ERROR_MESSAGE`]
///
/// `details` on the result holds the rule-1 string alone, if one was found.
pub fn translate(failure: &TransportFailure<'_>) -> DomainError {
    let body: Option<Value> = failure
        .body
        .and_then(|bytes| serde_json::from_slice(bytes).ok());
    let field = |name: &str| body.as_ref().and_then(|value| value.get(name));

    let detail = match field("details") {
        Some(Value::String(text)) => non_empty(text),
        Some(Value::Array(items)) => items.first().and_then(Value::as_str).and_then(non_empty),
        _ => None,
    };

    let message = detail
        .clone()
        .or_else(|| field("message").and_then(Value::as_str).and_then(non_empty))
        .or_else(|| field("error").and_then(Value::as_str).and_then(non_empty))
        .or_else(|| failure.transport_message.and_then(non_empty))
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

    DomainError {
        kind: ErrorKind::from_status(failure.status),
        message,
        status: failure.status,
        details: detail.map(|d| vec![d]),
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Split `"field: message"` into its parts; the field is a single word.
fn split_field_detail(detail: &str) -> Option<(&str, &str)> {
    let (field, message) = detail.split_once(':')?;
    let message = message.trim_start();
    let is_word = !field.is_empty() && field.chars().all(|c| c.is_alphanumeric() || c == '_');
    (is_word && !message.is_empty()).then_some((field, message))
}

mod messages {
    pub const NETWORK: &str = "Network error. Please check your connection.";
    pub const UNAUTHORIZED: &str = "Session expired. Please log in again.";
    pub const FORBIDDEN: &str = "You do not have permission to perform this action.";
    pub const SERVER: &str = "Server error. Please try again later.";
    pub const VALIDATION: &str = "Please check your input and try again.";
    pub const RATE_LIMIT: &str = "Too many attempts. Please try again later.";
    pub const UNAVAILABLE: &str = "Service temporarily unavailable. Please try again later.";
    pub const TIMEOUT: &str = "Request timeout. Please check your connection and try again.";
}
