//! Authorized request pipeline for the timeclock API
//!
//! Every resource client calls [`ApiClient::request`] and otherwise knows
//! nothing about credentials. The pipeline:
//!
//! 1. Outbound: attach `Authorization: Bearer` from the `CredentialStore`
//!    and, on mutating verbs, the anti-forgery header from the cookie jar
//! 2. Send with a per-call timeout
//! 3. Inbound: on 401 from a non-credential endpoint, run one refresh
//!    (shared with any concurrent 401s) and replay the original request once
//! 4. On refresh failure: clear the store, navigate to the login route,
//!    return the failure
//! 5. Every unrecovered failure is translated into a [`DomainError`]

pub mod client;
pub mod error;
pub mod inbound;
pub mod metrics;
pub mod navigator;
pub mod outbound;
pub mod refresh;
pub mod request;
pub mod session;

#[cfg(test)]
mod test_support;

pub use client::{ApiClient, ApiResponse, ClientConfig};
pub use error::{BuildError, DomainError, ErrorKind, TransportFailure, translate};
pub use inbound::{CredentialEndpoints, InboundAction, decide};
pub use navigator::{LoggingNavigator, Navigator};
pub use refresh::{RefreshProtocol, RefreshSettings, spawn_refresh_task};
pub use request::{ApiRequest, RequestContext};
pub use session::{AuthSession, CurrentUser, UserRole};
