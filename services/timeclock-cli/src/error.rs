//! CLI argument errors

use thiserror::Error;

/// Raised by the argument value parsers
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request path must start with '/': {0}")]
    InvalidPath(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
