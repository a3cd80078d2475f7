//! SDK configuration.
//!
//! Sources, lowest to highest precedence: defaults, TOML text, environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::TargetOrigin;

pub const DEFAULT_DEVELOPMENT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PRODUCTION_BASE_URL: &str = "https://api.taskframe.io";

pub const ENV_DEBUG: &str = "TASKFRAME_DEBUG";
pub const ENV_TARGET_ORIGIN: &str = "TASKFRAME_TARGET_ORIGIN";
pub const ENV_API_BASE_URL: &str = "TASKFRAME_API_BASE_URL";
pub const ENV_DEV_API_BASE_URL: &str = "TASKFRAME_DEV_API_BASE_URL";
pub const ENV_PROD_API_BASE_URL: &str = "TASKFRAME_PROD_API_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Base URLs for the remote task execution API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub development_base_url: String,
    pub production_base_url: String,
    /// Always wins over hostname detection when set.
    pub base_url_override: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            development_base_url: DEFAULT_DEVELOPMENT_BASE_URL.to_string(),
            production_base_url: DEFAULT_PRODUCTION_BASE_URL.to_string(),
            base_url_override: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Log protocol-level no-ops (duplicate completion, channel noise).
    pub debug: bool,

    /// Restricts outbound delivery and inbound acceptance. Defaults to `*`;
    /// pin the host origin in production.
    pub target_origin: TargetOrigin,

    pub api: ApiConfig,
}

impl SdkConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults overlaid with `TASKFRAME_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by `lookup` (environment-variable names).
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = parse_bool(ENV_DEBUG, value)?;
        }
        if let Some(value) = lookup(ENV_TARGET_ORIGIN) {
            self.target_origin = TargetOrigin::from(value);
        }
        if let Some(value) = lookup(ENV_API_BASE_URL) {
            self.api.base_url_override = Some(value);
        }
        if let Some(value) = lookup(ENV_DEV_API_BASE_URL) {
            self.api.development_base_url = value;
        }
        if let Some(value) = lookup(ENV_PROD_API_BASE_URL) {
            self.api.production_base_url = value;
        }
        Ok(self)
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_unrestricted_and_quiet() {
        let config = SdkConfig::default();
        assert!(!config.debug);
        assert_eq!(config.target_origin, TargetOrigin::Any);
        assert_eq!(config.api.development_base_url, DEFAULT_DEVELOPMENT_BASE_URL);
        assert!(config.api.base_url_override.is_none());
    }

    #[test]
    fn parses_toml() {
        let config = SdkConfig::from_toml_str(
            r#"
            debug = true
            target_origin = "https://host.example.com"

            [api]
            production_base_url = "https://tasks.example.com"
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(
            config.target_origin,
            TargetOrigin::exact("https://host.example.com")
        );
        assert_eq!(config.api.production_base_url, "https://tasks.example.com");
        assert_eq!(config.api.development_base_url, DEFAULT_DEVELOPMENT_BASE_URL);
    }

    #[test]
    fn env_overlay_wins() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DEBUG, "yes"),
            (ENV_TARGET_ORIGIN, "*"),
            (ENV_API_BASE_URL, "https://override.example.com"),
        ]);
        let config = SdkConfig::default()
            .overlay(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert!(config.debug);
        assert_eq!(config.target_origin, TargetOrigin::Any);
        assert_eq!(
            config.api.base_url_override.as_deref(),
            Some("https://override.example.com")
        );
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let err = SdkConfig::default()
            .overlay(|name| (name == ENV_DEBUG).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_DEBUG, .. }));
    }
}
