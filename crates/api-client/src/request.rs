//! Request description and per-call context
//!
//! An [`ApiRequest`] is a plain value the pipeline never mutates, so the
//! replay after a refresh is the original request with only the
//! `Authorization` header recomputed.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DomainError, ErrorKind};

/// Verbs that change server state and therefore carry the anti-forgery header.
pub const MUTATING_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// Route part of `path` in canonical form: exactly one leading `/`, no
/// trailing `/`, query and fragment removed.
///
/// `"auth/login"`, `"//auth/login/"` and `"/auth/login?next=x"` all give
/// `"/auth/login"`.
pub fn normalize_route(path: &str) -> String {
    let route = path.split(['?', '#']).next().unwrap_or_default();
    format!("/{}", route.trim_matches('/'))
}

/// One logical API call, relative to the versioned API base.
///
/// The path is stored in [`normalize_route`] form; a query string written
/// inline in the path is kept verbatim and sent ahead of any
/// [`query`](Self::query) pairs.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    raw_query: Option<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let raw_query = path
            .split('#')
            .next()
            .and_then(|p| p.split_once('?'))
            .map(|(_, query)| query.to_string())
            .filter(|query| !query.is_empty());
        Self {
            method,
            path: normalize_route(path),
            raw_query,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, DomainError> {
        let value = serde_json::to_value(body).map_err(|e| {
            DomainError::new(ErrorKind::Validation, format!("request body not serializable: {e}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn body_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the per-call timeout chosen by the client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string that was written inline in the path, without the `?`.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_mutating(&self) -> bool {
        MUTATING_METHODS.contains(&self.method)
    }
}

/// Per-call state threaded through the pipeline by value.
///
/// `retried` is the retry marker: set at most once per logical request,
/// and only by producing a new context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
    retried: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: format!("req_{}", Uuid::new_v4().simple()),
            retried: false,
        }
    }

    /// Context for the single replay after a refresh.
    pub fn retried(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            retried: true,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
