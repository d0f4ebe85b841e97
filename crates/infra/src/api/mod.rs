//! Authenticated access to the Carthooks REST API
//!
//! # Architecture
//!
//! - [`ApiClient`] sends JSON requests through the shared reqwest client
//! - Every request is decorated by a `RequestAuthenticator`: bearer token,
//!   proactive refresh, one refresh-and-retry on 401
//! - [`ApiError`] classifies failures for the caller; nothing here retries
//!   beyond that single 401 recovery

pub mod client;
pub mod errors;

pub use client::ApiClient;
pub use errors::{ApiError, ApiErrorCategory};
