//! Session credential primitives
//!
//! Holds the short-lived access credential in memory, observes the
//! anti-forgery cookie, and performs the raw refresh exchange. This crate
//! knows nothing about the request pipeline; `api-client` composes these
//! pieces into the outbound/inbound stages.
//!
//! Credential flow:
//! 1. Login response carries `access_token` → `CredentialStore::set()`
//! 2. Server sets the protected refresh cookie and the readable
//!    anti-forgery cookie on the shared cookie jar
//! 3. Outbound requests read `CredentialStore::get()` and
//!    `AntiForgeryReader::read()`
//! 4. On 401 the pipeline calls `token::refresh_access_token()`; the jar
//!    attaches the refresh cookie, the client never touches it

pub mod anti_forgery;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use anti_forgery::{AntiForgeryReader, find_cookie};
pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use token::{LoginRequest, TokenResponse, refresh_access_token};
