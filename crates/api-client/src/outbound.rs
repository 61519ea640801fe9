//! Outbound stage: shape each request before it is sent
//!
//! Pure header computation. The caller reads the credential store and the
//! anti-forgery cookie and passes what it found; nothing here blocks or
//! rejects a request, the server is authoritative.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::request::ApiRequest;

/// Headers to send for `request`.
///
/// - `bearer`, when present, becomes `Authorization: Bearer <value>`
/// - `csrf_token`, when present and the verb is mutating, is sent in
///   `csrf_header`
///
/// Values that are not valid header values are skipped with a warning.
pub fn prepare_headers(
    request: &ApiRequest,
    bearer: Option<&str>,
    csrf_token: Option<&str>,
    csrf_header: &HeaderName,
) -> HeaderMap {
    let mut headers = request.headers().clone();

    if let Some(token) = bearer {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "skipping unusable access token"),
        }
    }

    if request.is_mutating() {
        if let Some(token) = csrf_token {
            match HeaderValue::from_str(token) {
                Ok(value) => {
                    headers.insert(csrf_header.clone(), value);
                }
                Err(e) => warn!(header = %csrf_header, error = %e, "skipping unusable anti-forgery token"),
            }
        }
    }

    headers
}
