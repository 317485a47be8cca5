//! Application configuration.
//!
//! Settings come from an optional TOML file; the base URL can be overridden
//! through the `API_BASE_URL` environment variable. Every field has a
//! default, so an empty file is a valid configuration.

use crate::capture::CaptureSettings;
use crate::classify::ClassifierSettings;
use crate::device::{ConstraintError, DeviceConstraints};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the service base URL.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Largest accepted capture width or height.
pub const MAX_CAPTURE_DIMENSION: u32 = 8192;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL {0:?}: must be an absolute http(s) URL")]
    InvalidBaseUrl(String),
    #[error("invalid device constraints: {0}")]
    InvalidDevice(#[from] ConstraintError),
    #[error("invalid capture size {width}x{height} (each side must be 1-8192)")]
    InvalidCaptureSize { width: u32, height: u32 },
    #[error("request timeout must be at least one second")]
    InvalidTimeout,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub device: DeviceConstraints,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL shared by the classification, auth and history clients.
    pub base_url: String,
    /// Classification endpoint settings.
    pub classifier: ClassifierSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            classifier: ClassifierSettings::default(),
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads the file if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            tracing::debug!(%base_url, "Base URL taken from environment");
            config.api.base_url = base_url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.api.base_url)?;
        if self.api.classifier.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.device.validate()?;
        let valid = 1..=MAX_CAPTURE_DIMENSION;
        if !valid.contains(&self.capture.width) || !valid.contains(&self.capture.height) {
            return Err(ConfigError::InvalidCaptureSize {
                width: self.capture.width,
                height: self.capture.height,
            });
        }
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidBaseUrl(base_url.to_string())),
    }
}
