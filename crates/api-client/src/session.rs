//! Login, logout, and session restoration
//!
//! [`AuthSession`] is the only place that writes a credential obtained by
//! logging in; refreshes write through [`RefreshProtocol`](crate::RefreshProtocol).
//! Logout always clears the local session, even if the server call fails.

use common::Secret;
use serde::{Deserialize, Serialize};
use session_auth::{
    LOGIN_ENDPOINT, LOGOUT_ALL_ENDPOINT, LOGOUT_ENDPOINT, LoginRequest, ME_ENDPOINT, TokenResponse,
};
use tracing::{info, instrument, warn};

use crate::client::ApiClient;
use crate::error::DomainError;
use crate::request::ApiRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Manager,
    Employee,
}

/// The authenticated user, as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    client: ApiClient,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.store().is_authenticated()
    }

    /// Exchange email and password for an access credential.
    ///
    /// The server sets the refresh and anti-forgery cookies on the same
    /// response. A 401 here is [`ErrorKind::CredentialRejected`](crate::ErrorKind)
    /// and never triggers a refresh.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &Secret<String>) -> Result<(), DomainError> {
        let request = ApiRequest::post(LOGIN_ENDPOINT).json(&LoginRequest {
            email,
            password: password.expose(),
        })?;
        let token: TokenResponse = self.client.request(request).await?;
        self.client.store().set(token.access_token);
        info!("logged in");
        Ok(())
    }

    /// Try to resume a session from the refresh cookie at startup.
    ///
    /// Returns whether a credential is now held. Never navigates.
    pub async fn restore(&self) -> bool {
        self.client.refresh_protocol().restore().await
    }

    /// End this session on the server and locally.
    pub async fn logout(&self) -> Result<(), DomainError> {
        self.end_session(LOGOUT_ENDPOINT).await
    }

    /// Revoke every session of this user, then clear the local one.
    pub async fn logout_all(&self) -> Result<(), DomainError> {
        self.end_session(LOGOUT_ALL_ENDPOINT).await
    }

    pub async fn me(&self) -> Result<CurrentUser, DomainError> {
        self.client.request(ApiRequest::get(ME_ENDPOINT)).await
    }

    async fn end_session(&self, endpoint: &str) -> Result<(), DomainError> {
        let result = self.client.send(&ApiRequest::post(endpoint)).await;
        self.client.store().clear();
        match result {
            Ok(_) => {
                info!(endpoint, "logged out");
                Ok(())
            }
            Err(e) => {
                warn!(endpoint, error = %e, "server logout failed, local session cleared");
                Err(e)
            }
        }
    }
}
