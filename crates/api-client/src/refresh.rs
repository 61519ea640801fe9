//! Refresh protocol: obtain a new access credential, once per wave of 401s
//!
//! The exchange is single-flight. Every dispatched request records the
//! refresh epoch it observed; when its 401 reaches the protocol it takes
//! the refresh lock and:
//!
//! - epoch unchanged → this request leads: checks the anti-forgery cookie,
//!   runs the exchange, records the outcome, advances the epoch
//! - epoch advanced → a refresh finished after this request was sent, so
//!   it joins that recorded outcome instead of starting another exchange
//!
//! Only the leader runs the failure path (clear the store, navigate to the
//! login route), so a burst of concurrent 401s costs one exchange and at
//! most one navigation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::Secret;
use reqwest::header::HeaderName;
use session_auth::{AntiForgeryReader, CredentialStore, refresh_access_token};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{DomainError, ErrorKind};
use crate::metrics::{self, RefreshOutcome};
use crate::navigator::Navigator;

type Outcome = Result<Secret<String>, DomainError>;

/// Endpoint and routing settings for the refresh exchange.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Absolute URL of the refresh endpoint
    pub refresh_url: String,
    pub timeout: Duration,
    pub csrf_header: HeaderName,
    /// Route handed to the navigator when the session cannot be renewed
    pub login_route: String,
}

/// Orchestrates the "ask for a new access credential" exchange.
pub struct RefreshProtocol {
    http: reqwest::Client,
    settings: RefreshSettings,
    store: Arc<CredentialStore>,
    anti_forgery: AntiForgeryReader,
    navigator: Arc<dyn Navigator>,
    epoch: AtomicU64,
    last_outcome: Mutex<Option<Outcome>>,
}

impl RefreshProtocol {
    pub fn new(
        http: reqwest::Client,
        settings: RefreshSettings,
        store: Arc<CredentialStore>,
        anti_forgery: AntiForgeryReader,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            http,
            settings,
            store,
            anti_forgery,
            navigator,
            epoch: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        }
    }

    /// Number of completed refresh exchanges. Record this before sending a
    /// request and pass it to [`refresh`](Self::refresh) on 401.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Obtain a fresh access credential for a request sent at `observed_epoch`.
    ///
    /// On success the store already holds the returned value. On failure
    /// the store is empty and the navigator has been told to show the
    /// login route; the error has kind [`ErrorKind::SessionExpired`].
    pub async fn refresh(&self, observed_epoch: u64) -> Result<Secret<String>, DomainError> {
        let mut last = self.last_outcome.lock().await;

        if self.epoch() != observed_epoch {
            if let Some(outcome) = last.as_ref() {
                debug!(observed_epoch, "joining refresh completed by a concurrent request");
                metrics::record_refresh(RefreshOutcome::Joined);
                return outcome.clone();
            }
        }

        let outcome = self.exchange().await;
        *last = Some(outcome.clone());
        self.epoch.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Startup session restoration.
    ///
    /// Same exchange as [`refresh`](Self::refresh) but without the failure
    /// path: no navigation, and a failure is not recorded for joiners.
    /// Returns whether a credential is now held.
    pub async fn restore(&self) -> bool {
        let mut last = self.last_outcome.lock().await;

        let Some(csrf_token) = self.anti_forgery.read() else {
            debug!("no anti-forgery cookie, nothing to restore");
            return false;
        };

        match self.send_refresh(&csrf_token).await {
            Ok(token) => {
                info!("session restored from refresh cookie");
                *last = Some(Ok(token));
                self.epoch.fetch_add(1, Ordering::AcqRel);
                true
            }
            Err(e) => {
                debug!(error = %e, "session restore failed");
                self.store.clear();
                false
            }
        }
    }

    #[instrument(skip_all, fields(url = %self.settings.refresh_url))]
    async fn exchange(&self) -> Outcome {
        let Some(csrf_token) = self.anti_forgery.read() else {
            info!("no anti-forgery cookie, treating as no session");
            metrics::record_refresh(RefreshOutcome::NoSession);
            return Err(self.fail(session_auth::Error::NoSession(
                "anti-forgery cookie not present".into(),
            )));
        };

        match self.send_refresh(&csrf_token).await {
            Ok(token) => {
                info!("access token refreshed");
                metrics::record_refresh(RefreshOutcome::Success);
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, session ended");
                metrics::record_refresh(RefreshOutcome::Failure);
                Err(self.fail(e))
            }
        }
    }

    async fn send_refresh(&self, csrf_token: &str) -> session_auth::Result<Secret<String>> {
        let response = refresh_access_token(
            &self.http,
            &self.settings.refresh_url,
            &self.settings.csrf_header,
            csrf_token,
            self.settings.timeout,
        )
        .await?;
        self.store.set(response.access_token.clone());
        Ok(Secret::new(response.access_token))
    }

    /// Failure path: forget the credential and send the user to login.
    fn fail(&self, error: session_auth::Error) -> DomainError {
        self.store.clear();
        self.navigator.navigate(&self.settings.login_route);
        DomainError::from(error).with_kind(ErrorKind::SessionExpired)
    }
}

/// Spawn a background task that refreshes the access credential before it
/// expires.
///
/// Ticks every `interval` (skipping the immediate first tick) and runs the
/// shared refresh whenever the store reports the credential is inside its
/// refresh threshold. Failures take the normal failure path.
pub fn spawn_refresh_task(
    protocol: Arc<RefreshProtocol>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&protocol).await;
        }
    })
}

/// One check of the proactive refresh loop. Returns whether a refresh ran.
async fn refresh_cycle(protocol: &RefreshProtocol) -> bool {
    if !protocol.store().should_refresh() {
        return false;
    }

    debug!("access token inside refresh threshold, refreshing");
    match protocol.refresh(protocol.epoch()).await {
        Ok(_) => info!("background token refresh succeeded"),
        Err(e) => warn!(error = %e, "background token refresh failed"),
    }
    true
}
