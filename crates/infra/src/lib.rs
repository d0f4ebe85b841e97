//! # Carthooks Infrastructure
//!
//! I/O-bound pieces of the Carthooks API client.
//!
//! This crate contains:
//! - reqwest implementation of the OAuth token endpoint
//! - Authenticated JSON API client
//! - Client settings loader (environment, TOML, JSON)
//! - [`CarthooksClient`], which wires them to one token manager
//!
//! ## Architecture
//! - Implements traits defined in `carthooks-common`
//! - All lifecycle rules live in `carthooks-common`; this crate only moves bytes

pub mod api;
pub mod client;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use api::{ApiClient, ApiError, ApiErrorCategory};
pub use client::CarthooksClient;
pub use config::{ClientSettings, HttpSettings, OAuthSettings};
pub use http::{HttpClientBuilder, HttpTokenEndpoint};
