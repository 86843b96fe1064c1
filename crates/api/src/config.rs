//! Service Configuration
//!
//! Layered with the `config` crate: built-in defaults, then
//! `config/default.toml`, then the file named by `FRAUD_CONFIG`, then
//! `FRAUD__SECTION__KEY` environment variables.

use config::{Config, ConfigError, Environment, File};
use feature_engine::PreprocessingProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size, including batch uploads
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Model artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the model manifest, relative to the working directory
    pub manifest_path: PathBuf,
    /// Profile this deployment expects; a different artifact is refused
    pub expected_profile: Option<PreprocessingProfile>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("models/fraud_model.json"),
            expected_profile: None,
        }
    }
}

/// Inference service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Probability above which a transaction is CRITICAL
    pub critical_threshold: f64,
    /// Probability above which a transaction is HIGH
    pub high_threshold: f64,
    /// Maximum number of rows in one batch upload
    pub max_batch_rows: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            critical_threshold: 0.8,
            high_threshold: 0.5,
            max_batch_rows: 10_000,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from all configured sources
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os("FRAUD_CONFIG").map(PathBuf::from);
        Self::layered(file.as_deref())
    }

    fn layered(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::with_name("config/default").required(false));

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("FRAUD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.service;
        let unit = 0.0..=1.0;
        if !unit.contains(&s.high_threshold) || !unit.contains(&s.critical_threshold) {
            return Err(ConfigError::Message(
                "service thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if s.high_threshold > s.critical_threshold {
            return Err(ConfigError::Message(format!(
                "high_threshold {} exceeds critical_threshold {}",
                s.high_threshold, s.critical_threshold
            )));
        }
        if s.max_batch_rows == 0 {
            return Err(ConfigError::Message(
                "max_batch_rows must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
