//! Volatile storage for the access credential
//!
//! Holds at most one access credential in memory. Nothing here is ever
//! written to disk: losing the credential on restart bounds how long a
//! leaked access token stays usable. Expiry is detected lazily on read.
//!
//! The store is an explicit object built once at startup and shared via
//! `Arc` with the request pipeline and anything that needs to ask whether
//! the user is authenticated.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::Secret;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::{ACCESS_TOKEN_LIFETIME, REFRESH_THRESHOLD};

/// The current access credential.
///
/// `expires_at` is always `issued_at + lifetime` of the owning store.
#[derive(Debug, Clone)]
pub struct Credential {
    value: Secret<String>,
    issued_at: Instant,
    expires_at: Instant,
}

impl Credential {
    pub fn value(&self) -> &str {
        self.value.expose()
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// In-memory holder of the access credential and its expiry.
///
/// Methods are synchronous; the lock is never held across an await point.
pub struct CredentialStore {
    lifetime: Duration,
    refresh_threshold: Duration,
    state: Mutex<Option<Credential>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_LIFETIME, REFRESH_THRESHOLD)
    }
}

impl CredentialStore {
    pub fn new(lifetime: Duration, refresh_threshold: Duration) -> Self {
        Self {
            lifetime,
            refresh_threshold,
            state: Mutex::new(None),
        }
    }

    /// Store a new access credential, replacing any previous one.
    pub fn set(&self, value: impl Into<String>) {
        let issued_at = Instant::now();
        let credential = Credential {
            value: Secret::new(value.into()),
            issued_at,
            expires_at: issued_at + self.lifetime,
        };
        *self.lock() = Some(credential);
        debug!(lifetime_secs = self.lifetime.as_secs(), "stored access credential");
    }

    /// Current access credential value, or `None` when absent or expired.
    ///
    /// An expired credential is discarded here, so a stale value is never
    /// returned.
    pub fn get(&self) -> Option<String> {
        let mut state = self.lock();
        match state.as_ref() {
            Some(credential) if Instant::now() >= credential.expires_at => {
                *state = None;
                debug!("access credential expired, cleared");
                None
            }
            Some(credential) => Some(credential.value().to_string()),
            None => None,
        }
    }

    /// Discard the credential and its expiry.
    pub fn clear(&self) {
        if self.lock().take().is_some() {
            debug!("cleared access credential");
        }
    }

    /// Whether the credential is within `refresh_threshold` of expiring.
    ///
    /// Always false when no credential is held.
    pub fn should_refresh(&self) -> bool {
        let state = self.lock();
        let Some(credential) = state.as_ref() else {
            return false;
        };
        match credential.expires_at.checked_sub(self.refresh_threshold) {
            Some(refresh_at) => Instant::now() >= refresh_at,
            None => true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    /// Remaining lifetime of the current credential.
    pub fn expires_in(&self) -> Option<Duration> {
        let state = self.lock();
        let credential = state.as_ref()?;
        let now = Instant::now();
        (credential.expires_at > now).then(|| credential.expires_at - now)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn refresh_threshold(&self) -> Duration {
        self.refresh_threshold
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credential>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
