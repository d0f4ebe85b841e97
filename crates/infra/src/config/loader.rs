//! Configuration loader
//!
//! Loads client settings from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CARTHOOKS_BASE_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CARTHOOKS_BASE_URL`: API host (required)
//! - `CARTHOOKS_TIMEOUT_SECS`: HTTP timeout in seconds
//! - `CARTHOOKS_USER_AGENT`: User-Agent header
//! - `CARTHOOKS_TOKEN_PATH`: Token endpoint path or URL
//! - `CARTHOOKS_AUTHORIZE_PATH`: Authorize endpoint path or URL
//! - `CARTHOOKS_CLIENT_ID` / `CARTHOOKS_CLIENT_SECRET`: OAuth credentials
//!   (both or neither)
//! - `CARTHOOKS_AUTO_REFRESH`: Whether to refresh automatically (true/false)
//! - `CARTHOOKS_REFRESH_TOKEN`: Refresh token from a previous session
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./carthooks.toml` or `./carthooks.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use super::settings::{ClientSettings, OAuthSettings};
use crate::api::ApiError;

type Result<T> = std::result::Result<T, ApiError>;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["carthooks.toml", "carthooks.json", "config.toml", "config.json"];

/// Load settings with automatic fallback strategy
///
/// Uses environment variables when `CARTHOOKS_BASE_URL` is set, otherwise
/// falls back to a config file. An invalid environment value is reported
/// as-is rather than hidden by the file fallback.
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - An environment value is invalid
/// - No config file is found when the environment is not used
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<ClientSettings> {
    if optional_env("CARTHOOKS_BASE_URL").is_none() {
        tracing::debug!("CARTHOOKS_BASE_URL not set, loading configuration from file");
        return load_from_file(None);
    }

    let settings = load_from_env()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(settings)
}

/// Load settings from environment variables
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `ApiError::Config` if `CARTHOOKS_BASE_URL` is missing, a value
/// is invalid, or only one of the OAuth credentials is set.
pub fn load_from_env() -> Result<ClientSettings> {
    let mut settings = ClientSettings::new(env_var("CARTHOOKS_BASE_URL")?);

    if let Some(timeout) = optional_env("CARTHOOKS_TIMEOUT_SECS") {
        settings.http.timeout_secs = timeout
            .parse::<u64>()
            .map_err(|e| ApiError::Config(format!("Invalid timeout: {e}")))?;
    }
    if let Some(agent) = optional_env("CARTHOOKS_USER_AGENT") {
        settings.http.user_agent = agent;
    }
    if let Some(path) = optional_env("CARTHOOKS_TOKEN_PATH") {
        settings.token_path = path;
    }
    if let Some(path) = optional_env("CARTHOOKS_AUTHORIZE_PATH") {
        settings.authorize_path = path;
    }

    settings.oauth = match (optional_env("CARTHOOKS_CLIENT_ID"), optional_env("CARTHOOKS_CLIENT_SECRET")) {
        (Some(client_id), Some(client_secret)) => Some(OAuthSettings {
            client_id,
            client_secret,
            auto_refresh: env_bool("CARTHOOKS_AUTO_REFRESH", true),
            refresh_token: optional_env("CARTHOOKS_REFRESH_TOKEN"),
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::Config(
                "CARTHOOKS_CLIENT_ID and CARTHOOKS_CLIENT_SECRET must be set together".to_string(),
            ))
        }
    };

    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::Config(format!("Failed to read config file: {e}")))?;

    parse_settings(&contents, &config_path)
}

/// Parse settings from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `ApiError::Config` if format is invalid or parsing fails.
pub fn parse_settings(contents: &str, path: &Path) -> Result<ClientSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ApiError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents, then the
/// executable's directory and its two parents.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `ApiError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    optional_env(key)
        .ok_or_else(|| ApiError::Config(format!("Missing required environment variable: {key}")))
}

/// Non-empty environment variable, if set
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
