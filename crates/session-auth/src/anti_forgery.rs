//! Anti-forgery cookie observation
//!
//! The server sets a readable `csrf_token` cookie next to the protected
//! refresh cookie. The client echoes it back on mutating requests
//! (double-submit) and treats its presence as a hint that a refresh cookie
//! probably exists. That hint only saves a pointless round trip; the server
//! still decides whether the refresh cookie is valid.

use std::sync::Arc;

use reqwest::Url;
use reqwest::cookie::CookieStore;

/// Find the first `name=value` pair in a raw `Cookie` header string.
///
/// Empty values are treated as absent.
pub fn find_cookie<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name && !value.is_empty()).then_some(value)
    })
}

/// Reads the anti-forgery token from the shared cookie jar.
///
/// Holds no state of its own: every `read()` consults the jar, so a token
/// rotated by a login or refresh response is seen immediately.
#[derive(Clone)]
pub struct AntiForgeryReader {
    cookies: Arc<dyn CookieStore>,
    origin: Url,
    cookie_name: String,
}

impl AntiForgeryReader {
    /// `origin` is the URL whose cookies are consulted (the API base URL).
    pub fn new(cookies: Arc<dyn CookieStore>, origin: Url, cookie_name: impl Into<String>) -> Self {
        Self {
            cookies,
            origin,
            cookie_name: cookie_name.into(),
        }
    }

    /// Current anti-forgery token, verbatim, or `None` if the cookie is not set.
    pub fn read(&self) -> Option<String> {
        let header = self.cookies.cookies(&self.origin)?;
        let raw = header.to_str().ok()?;
        find_cookie(raw, &self.cookie_name).map(str::to_owned)
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

impl std::fmt::Debug for AntiForgeryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiForgeryReader")
            .field("origin", &self.origin.as_str())
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}
