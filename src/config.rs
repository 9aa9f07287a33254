//! Configuration management for NeuroNarrative
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{NarrativeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for NeuroNarrative
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote chat/analytics service settings
    #[serde(default)]
    pub service: ServiceConfig,
    /// Chat session behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Local session store settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL under which all API paths live
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_service_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}

fn default_service_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("neuronarrative/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_service_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Idle time before the anti-freeze check runs (seconds)
    #[serde(default = "default_engagement_timeout")]
    pub engagement_timeout_seconds: u64,

    /// A context summary is requested every this many completed turns
    #[serde(default = "default_summary_interval")]
    pub summary_interval_turns: usize,

    /// Number of trailing messages sent with a summary request
    #[serde(default = "default_summary_window")]
    pub summary_window_messages: usize,

    /// Maximum number of entries kept in a child's session index
    #[serde(default = "default_session_index_cap")]
    pub session_index_cap: usize,

    /// Theme used when the child has no stored preference
    #[serde(default = "default_theme")]
    pub default_theme: String,

    /// Input mode reported when a session starts ("type" or "voice")
    #[serde(default = "default_mode")]
    pub default_mode: String,

    /// Speak assistant responses through the configured speaker
    #[serde(default)]
    pub voice_output: bool,
}

fn default_engagement_timeout() -> u64 {
    40
}

fn default_summary_interval() -> usize {
    4
}

fn default_summary_window() -> usize {
    8
}

fn default_session_index_cap() -> usize {
    50
}

fn default_theme() -> String {
    "ocean".to_string()
}

fn default_mode() -> String {
    "type".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            engagement_timeout_seconds: default_engagement_timeout(),
            summary_interval_turns: default_summary_interval(),
            summary_window_messages: default_summary_window(),
            session_index_cap: default_session_index_cap(),
            default_theme: default_theme(),
            default_mode: default_mode(),
            voice_output: false,
        }
    }
}

/// Local store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Directory of the embedded store; the platform data dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NarrativeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| NarrativeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("NEURONARRATIVE_BASE_URL") {
            self.service.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("NEURONARRATIVE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.service.timeout_seconds = value;
            } else {
                tracing::warn!("Ignoring invalid NEURONARRATIVE_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("NEURONARRATIVE_ENGAGEMENT_TIMEOUT") {
            if let Ok(value) = timeout.parse() {
                self.chat.engagement_timeout_seconds = value;
            } else {
                tracing::warn!(
                    "Ignoring invalid NEURONARRATIVE_ENGAGEMENT_TIMEOUT: {}",
                    timeout
                );
            }
        }

        if let Ok(store) = std::env::var("NEURONARRATIVE_STORE_PATH") {
            self.storage.path = Some(PathBuf::from(store));
        }

        if let Ok(voice) = std::env::var("NEURONARRATIVE_VOICE_OUTPUT") {
            match voice.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.chat.voice_output = true,
                "0" | "false" | "no" | "off" => self.chat.voice_output = false,
                other => tracing::warn!("Ignoring invalid NEURONARRATIVE_VOICE_OUTPUT: {}", other),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(base_url) = &cli.base_url {
            self.service.base_url = base_url.clone();
        }
        if let Some(store) = &cli.store {
            self.storage.path = Some(store.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(NarrativeError::Config("service.base_url cannot be empty".to_string()).into());
        }

        let parsed = url::Url::parse(&self.service.base_url).map_err(|e| {
            NarrativeError::Config(format!(
                "Invalid service.base_url {}: {}",
                self.service.base_url, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NarrativeError::Config(format!(
                "service.base_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.service.timeout_seconds == 0 {
            return Err(NarrativeError::Config(
                "service.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !(10..=600).contains(&self.chat.engagement_timeout_seconds) {
            return Err(NarrativeError::Config(
                "chat.engagement_timeout_seconds must be between 10 and 600".to_string(),
            )
            .into());
        }

        if self.chat.summary_interval_turns == 0 {
            return Err(NarrativeError::Config(
                "chat.summary_interval_turns must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.session_index_cap == 0 {
            return Err(NarrativeError::Config(
                "chat.session_index_cap must be greater than 0".to_string(),
            )
            .into());
        }

        let valid_modes = ["type", "voice"];
        if !valid_modes.contains(&self.chat.default_mode.as_str()) {
            return Err(NarrativeError::Config(format!(
                "Invalid chat.default_mode: {}. Must be one of: {}",
                self.chat.default_mode,
                valid_modes.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.chat.engagement_timeout_seconds, 40);
        assert_eq!(config.chat.summary_interval_turns, 4);
        assert_eq!(config.chat.session_index_cap, 50);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = Config::default();
        config.service.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.service.base_url = "ftp://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_engagement_timeout_bounds() {
        let mut config = Config::default();
        config.chat.engagement_timeout_seconds = 5;
        assert!(config.validate().is_err());

        config.chat.engagement_timeout_seconds = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_summary_interval() {
        let mut config = Config::default();
        config.chat.summary_interval_turns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_mode() {
        let mut config = Config::default();
        config.chat.default_mode = "telepathy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
service:
  base_url: http://localhost:8080/api
  timeout_seconds: 15
chat:
  engagement_timeout_seconds: 60
  voice_output: true
storage:
  path: /tmp/nn-store
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.service.base_url, "http://localhost:8080/api");
        assert_eq!(config.service.timeout_seconds, 15);
        assert_eq!(config.chat.engagement_timeout_seconds, 60);
        assert_eq!(config.chat.summary_interval_turns, 4);
        assert!(config.chat.voice_output);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/nn-store")));
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/neuronarrative.yaml", &cli).unwrap();
        assert_eq!(config.chat.default_theme, "ocean");
    }

    #[test]
    #[serial]
    fn test_cli_overrides_base_url_and_store() {
        let cli = crate::cli::Cli {
            base_url: Some("http://10.0.0.2:5000/api".to_string()),
            store: Some(PathBuf::from("/tmp/override")),
            ..Default::default()
        };
        let config = Config::load("/nonexistent/neuronarrative.yaml", &cli).unwrap();
        assert_eq!(config.service.base_url, "http://10.0.0.2:5000/api");
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/override")));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides() {
        std::env::set_var("NEURONARRATIVE_BASE_URL", "http://env-host/api");
        std::env::set_var("NEURONARRATIVE_ENGAGEMENT_TIMEOUT", "55");
        std::env::set_var("NEURONARRATIVE_VOICE_OUTPUT", "on");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(config.service.base_url, "http://env-host/api");
        assert_eq!(config.chat.engagement_timeout_seconds, 55);
        assert!(config.chat.voice_output);

        std::env::remove_var("NEURONARRATIVE_BASE_URL");
        std::env::remove_var("NEURONARRATIVE_ENGAGEMENT_TIMEOUT");
        std::env::remove_var("NEURONARRATIVE_VOICE_OUTPUT");
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_ignores_garbage_numbers() {
        std::env::set_var("NEURONARRATIVE_TIMEOUT_SECONDS", "soon");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.service.timeout_seconds, 60);
        std::env::remove_var("NEURONARRATIVE_TIMEOUT_SECONDS");
    }
}
