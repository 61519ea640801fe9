//! Token wire types and the refresh exchange
//!
//! Login goes through the ordinary request pipeline (its 401 must surface
//! as a credentials error), so only the wire types live here. The refresh
//! exchange is sent directly: it is the one request the inbound stage must
//! never recurse into.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Credentials posted to the login endpoint.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body returned by login, refresh, and invite acceptance.
///
/// The refresh credential never appears here: the server sets it as an
/// HttpOnly cookie on the same response.
#[derive(Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Ask the server for a new access token.
///
/// Sends an empty POST to `url`. The cookie jar on `client` attaches the
/// protected refresh cookie; this function never reads or sends it itself.
/// The anti-forgery token is echoed in `csrf_header` like any other
/// mutating request.
#[instrument(skip_all, fields(url = %url))]
pub async fn refresh_access_token(
    client: &reqwest::Client,
    url: &str,
    csrf_header: &HeaderName,
    csrf_token: &str,
    timeout: Duration,
) -> Result<TokenResponse> {
    let csrf_value = HeaderValue::from_str(csrf_token)
        .map_err(|e| Error::NoSession(format!("unusable anti-forgery token: {e}")))?;

    let response = client
        .post(url)
        .header(csrf_header, csrf_value)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        debug!(status = status.as_u16(), "refresh endpoint rejected the session");
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use tokio::net::TcpListener;

    fn csrf_header() -> HeaderName {
        HeaderName::from_static("x-csrf-token")
    }

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn token_response_deserializes_ignoring_extra_fields() {
        let json = r#"{"access_token":"at_abc","token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let token = TokenResponse {
            access_token: "at_secret".into(),
        };
        assert!(!format!("{token:?}").contains("at_secret"));

        let login = LoginRequest {
            email: "ada@example.com",
            password: "hunter2",
        };
        let debug = format!("{login:?}");
        assert!(debug.contains("ada@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn login_request_serializes_both_fields() {
        let login = LoginRequest {
            email: "ada@example.com",
            password: "hunter2",
        };
        let json = serde_json::to_value(&login).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["password"], "hunter2");
    }

    #[tokio::test]
    async fn refresh_sends_empty_body_with_csrf_header() {
        let app = axum::Router::new().route(
            "/v1/auth/refresh",
            post(|headers: HeaderMap, body: String| async move {
                assert!(body.is_empty(), "refresh must not send a body");
                match headers.get("x-csrf-token").and_then(|v| v.to_str().ok()) {
                    Some("tok123") => (
                        StatusCode::OK,
                        axum::Json(serde_json::json!({"access_token": "at_new"})),
                    ),
                    _ => (
                        StatusCode::FORBIDDEN,
                        axum::Json(serde_json::json!({"error": "Forbidden"})),
                    ),
                }
            }),
        );
        let base = serve(app).await;

        let token = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{base}/v1/auth/refresh"),
            &csrf_header(),
            "tok123",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(token.access_token, "at_new");
    }

    #[tokio::test]
    async fn refresh_rejection_keeps_status_and_body() {
        let app = axum::Router::new().route(
            "/v1/auth/refresh",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    r#"{"error":"Unauthorized","message":"Refresh token revoked"}"#,
                )
            }),
        );
        let base = serve(app).await;

        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{base}/v1/auth/refresh"),
            &csrf_header(),
            "tok123",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match err {
            Error::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Refresh token revoked"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_with_malformed_body_is_token_exchange_error() {
        let app = axum::Router::new().route("/v1/auth/refresh", post(|| async { "not json" }));
        let base = serve(app).await;

        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{base}/v1/auth/refresh"),
            &csrf_header(),
            "tok123",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn refresh_against_closed_port_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("http://{addr}/v1/auth/refresh"),
            &csrf_header(),
            "tok123",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
        assert_eq!(err.status(), None);
    }
}
