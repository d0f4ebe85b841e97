//! Configuration loading and management
//!
//! This module provides utilities for loading client settings from
//! environment variables and files.

pub mod loader;
pub mod settings;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, parse_settings, probe_config_paths};
pub use settings::{
    ClientSettings, HttpSettings, OAuthSettings, DEFAULT_AUTHORIZE_PATH, DEFAULT_BASE_URL,
    DEFAULT_TOKEN_PATH,
};
