//! Error types for session credential operations

/// Errors from the refresh exchange and related session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response was received (connect failure, timeout, reset).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The server answered 2xx but the body was not a token response.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// No anti-forgery cookie is readable, so no session can exist.
    #[error("no active session: {0}")]
    NoSession(String),
}

impl Error {
    /// HTTP status of the rejection, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
