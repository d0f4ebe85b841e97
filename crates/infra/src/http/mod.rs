//! HTTP bindings
//!
//! - [`HttpClientBuilder`]: reqwest client from [`HttpSettings`](crate::config::HttpSettings)
//! - [`HttpTokenEndpoint`]: the token endpoint used by the token manager

pub mod client;
pub mod token_endpoint;

pub use client::HttpClientBuilder;
pub use token_endpoint::HttpTokenEndpoint;
