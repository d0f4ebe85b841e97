//! Transport-independent core of the Carthooks API client.
//!
//! # Safety and Quality
//!
//! Nothing here performs I/O directly: the token endpoint is injected through
//! [`auth::TokenEndpoint`], so every lifecycle rule can be exercised with the
//! mocks in `testing`.
//!
//! # Modules
//! - `auth`: token store, grants, authorize URL builder, token manager and
//!   request authenticator
//! - `error`: error classification shared by every crate in the workspace
//! - `testing`: mock token endpoint (feature `test-utils`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod error;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{
    AuthorizeCodeRequest, Grant, ManagerState, OAuthConfig, RequestAuthenticator, TokenEndpoint,
    TokenError, TokenManager, TokenSet, TokenStore, UnauthorizedSignal,
};
pub use error::{ErrorClassification, ErrorSeverity};
