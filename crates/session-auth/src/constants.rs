//! Session and API constants
//!
//! Endpoint paths are relative to the versioned API base
//! (`{base_url}{API_VERSION}`).

use std::time::Duration;

/// Default API origin when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Version prefix appended to the API origin
pub const API_VERSION: &str = "/v1";

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub const LOGOUT_ALL_ENDPOINT: &str = "/auth/logout-all";
pub const ME_ENDPOINT: &str = "/auth/me";

/// Client-side route the user is sent to when the session cannot be renewed
pub const LOGIN_ROUTE: &str = "/login";

/// Access tokens are valid for 15 minutes from issuance
pub const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Refresh when the access token expires within 2 minutes
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(2 * 60);

/// Readable (non-HttpOnly) cookie holding the anti-forgery token
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Header echoing the anti-forgery cookie on mutating requests
pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

/// Per-call timeout for ordinary API requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call timeout for credential endpoints (login, refresh, logout)
pub const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message used when neither the server nor the transport said anything useful
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";
