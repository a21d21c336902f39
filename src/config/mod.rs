//! Configuration management for threatgraph
//!
//! Loads the TOML configuration, applies environment overrides and validates
//! the result before anything else runs.

use crate::error::{Result, ThreatGraphError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub risk_keywords: RiskKeywords,
    #[serde(default)]
    pub parsing: ParsingConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving graph artifacts when no explicit path is given
    pub data_dir: PathBuf,
}

/// Three-tier keyword lexicon used to tag risky subdomains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskKeywords {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

impl RiskKeywords {
    /// Tiers in tagging order, paired with the suffix used in tags
    pub fn tiers(&self) -> [(&'static str, &[String]); 3] {
        [
            ("high", &self.high),
            ("medium", &self.medium),
            ("low", &self.low),
        ]
    }
}

impl Default for RiskKeywords {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect();
        Self {
            high: words(&["vpn", "admin", "root", "backup", "test", "dev", "staging"]),
            medium: words(&["portal", "login", "secure", "api", "remote"]),
            low: words(&["www", "blog", "shop", "news"]),
        }
    }
}

/// Parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Source label recorded on entities created by the emails parser
    pub email_source: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            email_source: "theharvester".to_string(),
        }
    }
}

/// Correlation engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Minimum degree for an entity to be flagged as a high-value target
    pub high_value_threshold: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: 3,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ThreatGraphError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ThreatGraphError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;

        config.with_env_overrides()
    }

    /// Apply environment overrides, then validate the result
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.apply_env_overrides();
        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ThreatGraphError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: THREATGRAPH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("THREATGRAPH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "PARSING__EMAIL_SOURCE" => {
                self.parsing.email_source = value.to_string();
            }
            "CORRELATION__HIGH_VALUE_THRESHOLD" => {
                self.correlation.high_value_threshold =
                    value
                        .parse()
                        .map_err(|_| ThreatGraphError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Cannot parse '{}' as an integer", value),
                        })?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ThreatGraphError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("threatgraph").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            ThreatGraphError::Config("Cannot determine home directory".to_string())
        })?;

        Ok(home_dir.join(".threatgraph"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.threatgraph"),
            },
            risk_keywords: RiskKeywords::default(),
            parsing: ParsingConfig::default(),
            correlation: CorrelationConfig::default(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ThreatGraphError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            ThreatGraphError::Config("Cannot determine home directory".to_string())
        })?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
