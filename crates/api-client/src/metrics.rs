//! Pipeline metrics
//!
//! - `api_requests_total` (counter): labels `method`, `status`
//! - `session_refresh_total` (counter): label `outcome`
//!
//! No recorder is installed here; without one every call is a no-op.

/// Outcome label for `session_refresh_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success,
    Failure,
    /// No anti-forgery cookie, exchange skipped
    NoSession,
    /// Reused the result of a concurrent refresh
    Joined,
}

impl RefreshOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Success => "success",
            RefreshOutcome::Failure => "failure",
            RefreshOutcome::NoSession => "no_session",
            RefreshOutcome::Joined => "joined",
        }
    }
}

/// Record one dispatched request with its response status.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one pass through the refresh protocol.
pub fn record_refresh(outcome: RefreshOutcome) {
    metrics::counter!("session_refresh_total", "outcome" => outcome.label()).increment(1);
}
