//! The authorized HTTP client
//!
//! [`ApiClient`] owns the reqwest client, the shared cookie jar, and the
//! refresh protocol. Cloning is cheap; clones share all state, including
//! the single-flight refresh.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::Secret;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderName;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use session_auth::{
    API_VERSION, AUTH_REQUEST_TIMEOUT, AntiForgeryReader, CSRF_COOKIE_NAME, CSRF_HEADER_NAME,
    CredentialStore, DEFAULT_BASE_URL, LOGIN_ROUTE, REFRESH_ENDPOINT, REQUEST_TIMEOUT,
};
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{BuildError, DomainError, ErrorKind, TransportFailure, translate};
use crate::inbound::{CredentialEndpoints, InboundAction, decide};
use crate::metrics;
use crate::navigator::Navigator;
use crate::outbound::prepare_headers;
use crate::refresh::{RefreshProtocol, RefreshSettings};
use crate::request::{ApiRequest, RequestContext};

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Version prefix appended to `base_url`
    pub api_version: String,
    pub timeout: Duration,
    /// Timeout for `/auth/*` calls
    pub auth_timeout: Duration,
    pub csrf_cookie: String,
    pub csrf_header: String,
    pub login_route: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: API_VERSION.to_string(),
            timeout: REQUEST_TIMEOUT,
            auth_timeout: AUTH_REQUEST_TIMEOUT,
            csrf_cookie: CSRF_COOKIE_NAME.to_string(),
            csrf_header: CSRF_HEADER_NAME.to_string(),
            login_route: LOGIN_ROUTE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Versioned API base, e.g. `http://localhost:8080/v1`.
    pub fn api_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.api_version)
    }
}

/// A response that reached the caller: success, or a failure to translate.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the body as JSON. An empty body decodes as `null`, so `()`
    /// and `Option<T>` work for 204 responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|e| {
            DomainError::new(ErrorKind::Server, format!("invalid response body: {e}"))
                .with_status(self.status.as_u16())
        })
    }

    /// Translate a failed response into a [`DomainError`].
    pub fn into_error(self) -> DomainError {
        let code = self.status.as_u16();
        let transport_message = format!("Request failed with status code {code}");
        translate(&TransportFailure {
            status: Some(code),
            body: Some(&self.body),
            transport_message: Some(&transport_message),
        })
    }
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    api_url: Url,
    csrf_header: HeaderName,
    store: Arc<CredentialStore>,
    anti_forgery: AntiForgeryReader,
    refresh: Arc<RefreshProtocol>,
    endpoints: CredentialEndpoints,
}

/// HTTP client that attaches credentials and recovers from expired access
/// tokens.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Build a client with a fresh in-memory cookie jar.
    pub fn new(
        config: ClientConfig,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, BuildError> {
        Self::with_cookie_store(config, store, navigator, Arc::new(Jar::default()))
    }

    /// Build a client over an existing cookie store.
    ///
    /// The store holds the protected refresh cookie and the readable
    /// anti-forgery cookie; the server sets both.
    pub fn with_cookie_store<C: CookieStore + 'static>(
        config: ClientConfig,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
        cookies: Arc<C>,
    ) -> Result<Self, BuildError> {
        let api_url = Url::parse(&config.api_url())
            .map_err(|e| BuildError::InvalidUrl(format!("{}: {e}", config.api_url())))?;
        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes())
            .map_err(|e| BuildError::InvalidHeader(format!("{}: {e}", config.csrf_header)))?;

        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()
            .map_err(|e| BuildError::Http(e.to_string()))?;

        let cookies: Arc<dyn CookieStore> = cookies;
        let anti_forgery = AntiForgeryReader::new(cookies, api_url.clone(), &config.csrf_cookie);

        let refresh = Arc::new(RefreshProtocol::new(
            http.clone(),
            RefreshSettings {
                refresh_url: format!("{}{REFRESH_ENDPOINT}", config.api_url()),
                timeout: config.auth_timeout,
                csrf_header: csrf_header.clone(),
                login_route: config.login_route.clone(),
            },
            store.clone(),
            anti_forgery.clone(),
            navigator,
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                api_url,
                csrf_header,
                store,
                anti_forgery,
                refresh,
                endpoints: CredentialEndpoints::default(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    pub fn anti_forgery(&self) -> &AntiForgeryReader {
        &self.inner.anti_forgery
    }

    /// Shared refresh protocol, for [`spawn_refresh_task`](crate::spawn_refresh_task).
    pub fn refresh_protocol(&self) -> &Arc<RefreshProtocol> {
        &self.inner.refresh
    }

    /// Send `request` and decode a successful JSON body as `T`.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, DomainError> {
        self.send(&request).await?.json()
    }

    /// Send `request` through the pipeline and return the raw response.
    ///
    /// Only 2xx/3xx responses are returned as `Ok`.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, DomainError> {
        let context = RequestContext::new();
        let span = info_span!(
            "api_request",
            request_id = context.request_id(),
            method = %request.method(),
            path = request.path(),
        );
        self.execute(request, context).instrument(span).await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        mut context: RequestContext,
    ) -> Result<ApiResponse, DomainError> {
        let mut bearer: Option<Secret<String>> = None;

        loop {
            // Epoch first: a credential stored by a concurrent refresh is
            // always visible once its epoch is.
            let epoch = self.inner.refresh.epoch();
            let response = self
                .dispatch(request, bearer.as_ref().map(|token| token.expose().as_str()))
                .await?;

            match decide(response.status, request.path(), &context, &self.inner.endpoints) {
                InboundAction::PassThrough if response.status.is_client_error()
                    || response.status.is_server_error() =>
                {
                    return Err(response.into_error());
                }
                InboundAction::PassThrough => return Ok(response),
                InboundAction::CredentialRejected => {
                    debug!("credential endpoint rejected the request");
                    return Err(response.into_error().with_kind(ErrorKind::CredentialRejected));
                }
                InboundAction::RetryExhausted => {
                    warn!("request rejected again after refresh");
                    return Err(response.into_error());
                }
                InboundAction::AttemptRefresh => {
                    debug!(epoch, "access token rejected, refreshing");
                    bearer = Some(self.inner.refresh.refresh(epoch).await?);
                    context = context.retried();
                }
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer_override: Option<&str>,
    ) -> Result<ApiResponse, DomainError> {
        let inner = &self.inner;
        let stored = inner.store.get();
        let bearer = bearer_override.or(stored.as_deref());
        let csrf_token = if request.is_mutating() {
            inner.anti_forgery.read()
        } else {
            None
        };
        let headers = prepare_headers(request, bearer, csrf_token.as_deref(), &inner.csrf_header);

        let mut builder = inner
            .http
            .request(request.method().clone(), self.url_for(request))
            .headers(headers)
            .timeout(self.timeout_for(request));
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            debug!(error = %e, "request failed before a response arrived");
            DomainError::from_transport(&e)
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| body_read_error(status, &e))?;

        metrics::record_request(request.method().as_str(), status.as_u16());
        debug!(status = status.as_u16(), "response received");
        Ok(ApiResponse { status, body })
    }

    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.inner.api_url.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), request.path());
        url.set_path(&path);
        url.set_query(request.raw_query());
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }
        url
    }

    fn timeout_for(&self, request: &ApiRequest) -> Duration {
        let config = &self.inner.config;
        request.timeout_override().unwrap_or_else(|| {
            if request.path().starts_with("/auth/") {
                config.auth_timeout
            } else {
                config.timeout
            }
        })
    }
}

/// A response whose status arrived but whose body did not: classified by
/// the status, with the transport's description as the message.
fn body_read_error(status: StatusCode, error: &reqwest::Error) -> DomainError {
    let code = status.as_u16();
    DomainError::from_transport(error)
        .with_status(code)
        .with_kind(ErrorKind::from_status(Some(code)))
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.api_url.as_str())
            .field("authenticated", &self.inner.store.is_authenticated())
            .finish_non_exhaustive()
    }
}
