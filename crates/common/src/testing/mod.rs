//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted [`TokenEndpoint`](crate::auth::TokenEndpoint)
//!   for exercising the token lifecycle without a network
//!
//! Enabled for unit tests and, for downstream crates, through the
//! `test-utils` feature.

pub mod mocks;

pub use mocks::{form_value, token_response, MockTokenEndpoint};
