//! Configuration schema for tpod
//!
//! Configuration is stored at `~/.config/tpod/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Pretrained model cache settings
    pub cache: CacheConfig,

    /// External trainer settings
    pub trainer: TrainerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Pretrained model cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,

    /// Timeout for a single archive download in seconds (0 = no timeout)
    pub download_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            download_timeout_secs: 1800,
        }
    }
}

/// External training entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Executable to run
    pub program: String,

    /// Arguments placed before the pipeline/model dir arguments
    pub args: Vec<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec![
                "-m".to_string(),
                "opentpod.object_detector.provider.tfod.tfod_train_wrapper".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[trainer]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.trainer.program, "python");
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [trainer]
            program = "/opt/venv/bin/python3"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.trainer.program, "/opt/venv/bin/python3");
        assert_eq!(config.trainer.args.len(), 2); // default preserved
        assert_eq!(config.cache.download_timeout_secs, 1800);
    }
}
