//! Inbound stage: decide what to do with a response
//!
//! Pure decision function; the client executes the I/O implied by each
//! action. Rules are evaluated in order:
//!
//! 1. status ≠ 401 → `PassThrough`
//! 2. 401 from a credential-issuing endpoint → `CredentialRejected`
//!    (bad credentials, and no recursion through the refresh endpoint)
//! 3. 401 on a replay → `RetryExhausted`
//! 4. otherwise → `AttemptRefresh`

use reqwest::StatusCode;
use session_auth::{LOGIN_ENDPOINT, REFRESH_ENDPOINT};

use crate::request::{RequestContext, normalize_route};

/// What the pipeline does with a received response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    /// Forward success as-is, translate any other failure
    PassThrough,
    /// 401 from login or refresh: surface verbatim, never refresh
    CredentialRejected,
    /// 401 after the one allowed replay: surface, never refresh again
    RetryExhausted,
    /// Refresh the access credential and replay once
    AttemptRefresh,
}

/// Paths whose 401 means "wrong credentials" rather than "session expired".
#[derive(Debug, Clone)]
pub struct CredentialEndpoints {
    paths: Vec<String>,
}

impl CredentialEndpoints {
    pub fn new(paths: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            paths: paths.into_iter().map(|p| normalize_route(p.as_ref())).collect(),
        }
    }

    /// Whether `path` names a credential endpoint, under any spelling
    /// [`normalize_route`] treats as equal.
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize_route(path);
        self.paths.iter().any(|p| *p == path)
    }
}

impl Default for CredentialEndpoints {
    fn default() -> Self {
        Self::new([LOGIN_ENDPOINT, REFRESH_ENDPOINT])
    }
}

/// Classify a response to `path` received under `context`.
pub fn decide(
    status: StatusCode,
    path: &str,
    context: &RequestContext,
    endpoints: &CredentialEndpoints,
) -> InboundAction {
    if status != StatusCode::UNAUTHORIZED {
        return InboundAction::PassThrough;
    }
    if endpoints.contains(path) {
        return InboundAction::CredentialRejected;
    }
    if context.is_retry() {
        return InboundAction::RetryExhausted;
    }
    InboundAction::AttemptRefresh
}
