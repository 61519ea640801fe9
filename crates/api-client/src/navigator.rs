//! Forced navigation seam
//!
//! When the session cannot be renewed the pipeline sends the user to the
//! login route. In a browser that is a full page navigation; here it is a
//! trait so the embedding application decides what "go to login" means.
//! Navigation is fire-and-forget: it cancels no in-flight request.

use tracing::warn;

/// Receives the terminal "re-authenticate" signal.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for headless use: logs that re-authentication is required.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: &str) {
        warn!(route, "session expired, re-authentication required");
    }
}
