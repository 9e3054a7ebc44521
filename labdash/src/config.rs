//! Configuration management via environment variables
//!
//! The dashboard configuration itself lives in YAML (see
//! [`labdash_common::config`]). This module provides helpers for reading the
//! environment variables that override parts of it at startup.

use labdash_common::config::DashboardConfig;
use labdash_common::error::CommonResult;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Get a non-empty environment variable
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Get an environment variable or a default value
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable parsed to a specific type
///
/// Returns `default` if the variable is unset. A value that fails to parse is
/// logged and also falls back to `default`.
pub fn get_env_parse<T: FromStr>(name: &str, default: T) -> T {
    match get_env(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    variable = name,
                    value = %raw,
                    "Ignoring unparseable environment variable"
                );
                default
            }
        },
        None => default,
    }
}

/// Resolve the configuration file path (`LABDASH_CONFIG`)
pub fn config_path() -> PathBuf {
    PathBuf::from(get_env_or("LABDASH_CONFIG", DEFAULT_CONFIG_PATH))
}

/// Apply environment overrides on top of a loaded configuration
///
/// - `LABDASH_HOST` / `LABDASH_PORT`: dashboard bind address
/// - `LABDASH_STATUS_INTERVAL_SECS`: poll cadence
/// - `LABDASH_HEARTBEAT_INTERVAL_SECS`: WebSocket ping cadence
pub fn apply_env_overrides(config: &mut DashboardConfig) {
    if let Some(host) = get_env("LABDASH_HOST") {
        config.dashboard.host = host;
    }
    config.dashboard.port = get_env_parse("LABDASH_PORT", config.dashboard.port);
    config.polling.status_interval_seconds = get_env_parse(
        "LABDASH_STATUS_INTERVAL_SECS",
        config.polling.status_interval_seconds,
    );
    config.websocket.heartbeat_interval_seconds = get_env_parse(
        "LABDASH_HEARTBEAT_INTERVAL_SECS",
        config.websocket.heartbeat_interval_seconds,
    );
}

/// Load the YAML configuration and apply environment overrides
pub fn load_dashboard_config(path: &Path) -> CommonResult<DashboardConfig> {
    let mut config = DashboardConfig::load(path)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}
