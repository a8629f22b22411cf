//! Configuration management for the sidepot service
//!
//! Centralized configuration with validation, defaults, and environment
//! variable support.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level service configuration.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SidepotConfig {
    pub engine: EngineConfig,
    pub gateway: GatewayConfig,
}

/// Engine worker settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound of the inbound event queue.
    pub queue_capacity: usize,
    /// Bound of the outbound notice broadcast channel.
    pub notice_capacity: usize,
    /// Refund accepted entries when a free-for-all ends with nobody
    /// standing. Off by default: the pot is forfeited.
    pub refund_on_void: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            notice_capacity: 256,
            refund_on_void: false,
        }
    }
}

/// HTTP/WebSocket gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 10,
        }
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> Result<SidepotConfig, ConfigError> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            SidepotConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> Result<SidepotConfig, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut SidepotConfig) -> Result<(), ConfigError> {
        if let Ok(addr) = env::var("SIDEPOT_GATEWAY_ADDRESS") {
            config.gateway.listen_address = addr;
        }
        if let Ok(port) = env::var("SIDEPOT_GATEWAY_PORT") {
            config.gateway.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "SIDEPOT_GATEWAY_PORT".to_string(),
                value: port,
                reason: "Invalid port number".to_string(),
            })?;
        }
        if let Ok(capacity) = env::var("SIDEPOT_QUEUE_CAPACITY") {
            config.engine.queue_capacity =
                capacity.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "SIDEPOT_QUEUE_CAPACITY".to_string(),
                    value: capacity,
                    reason: "Invalid capacity".to_string(),
                })?;
        }
        if let Ok(refund) = env::var("SIDEPOT_REFUND_ON_VOID") {
            config.engine.refund_on_void =
                refund.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "SIDEPOT_REFUND_ON_VOID".to_string(),
                    value: refund,
                    reason: "Invalid boolean value".to_string(),
                })?;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self, config: &SidepotConfig) -> Result<(), ConfigError> {
        if config.gateway.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if config.engine.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.queue_capacity".to_string(),
                value: "0".to_string(),
                reason: "Queue capacity cannot be zero".to_string(),
            });
        }

        if config.engine.notice_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.notice_capacity".to_string(),
                value: "0".to_string(),
                reason: "Notice capacity cannot be zero".to_string(),
            });
        }

        if config.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Request timeout cannot be zero".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &SidepotConfig, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write to {}: {}", path, e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: SidepotConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SidepotConfig::default(),
        }
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.config.gateway = gateway;
        self
    }

    pub fn build(self) -> SidepotConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a sample configuration file with every default spelled out.
pub fn generate_sample_config() -> Result<String, ConfigError> {
    toml::to_string_pretty(&SidepotConfig::default())
        .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SidepotConfig::default();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.engine.queue_capacity, 1024);
        assert!(!config.engine.refund_on_void);
    }

    #[test]
    fn test_config_validation() {
        let loader = ConfigLoader::new();
        let mut config = SidepotConfig::default();

        assert!(loader.validate(&config).is_ok());

        config.gateway.port = 0;
        assert!(loader.validate(&config).is_err());

        config = SidepotConfig::default();
        config.engine.queue_capacity = 0;
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .gateway(GatewayConfig {
                listen_address: "0.0.0.0".to_string(),
                port: 9000,
                allowed_origins: vec!["https://host.example".to_string()],
                request_timeout_secs: 5,
            })
            .build();

        assert_eq!(config.gateway.listen_address, "0.0.0.0");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.allowed_origins.len(), 1);
    }

    #[test]
    fn test_save_and_load_config() -> Result<(), ConfigError> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let original_config = SidepotConfig::default();

        let loader = ConfigLoader::new();
        loader.save(&original_config, path)?;

        let loaded_config = ConfigLoader::new().with_path(path).load()?;

        assert_eq!(loaded_config.gateway.port, original_config.gateway.port);
        assert_eq!(
            loaded_config.engine.refund_on_void,
            original_config.engine.refund_on_void
        );

        Ok(())
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = generate_sample_config().unwrap();
        let config: SidepotConfig = toml::from_str(&sample).unwrap();
        assert_eq!(config.gateway.port, SidepotConfig::default().gateway.port);
        assert!(sample.contains("refund_on_void"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[engine]\nrefund_on_void = true\n").unwrap();

        let config = ConfigLoader::new()
            .with_path(temp_file.path())
            .load()
            .unwrap();

        assert!(config.engine.refund_on_void);
        assert_eq!(config.engine.queue_capacity, 1024);
        assert_eq!(config.gateway.port, 8080);
    }
}
