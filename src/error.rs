//! Error types for tpod
//!
//! All modules use `TpodResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tpod operations
pub type TpodResult<T> = Result<T, TpodError>;

/// All errors that can occur in tpod
#[derive(Error, Debug)]
pub enum TpodError {
    // Registry errors
    #[error("Provider type already registered: {0}")]
    RegistrationConflict(String),

    #[error("Unknown detector type: {0}")]
    UnknownProviderType(String),

    // Cache errors
    #[error("Failed to cache pretrained model {key} from {url}: {reason}")]
    CacheDownloadFailure {
        key: String,
        url: String,
        reason: String,
    },

    #[error("Failed to find pretrained model checkpoint in {0}")]
    CheckpointNotFound(PathBuf),

    // Preparation errors
    #[error("Parameter ({0}) is required, but not given")]
    MissingRequiredParameter(String),

    #[error("Parameter ({key}) must be {expected}, got '{value}'")]
    InvalidParameter {
        key: String,
        expected: String,
        value: String,
    },

    #[error("Invalid label map {path}: {reason}")]
    LabelMapError { path: PathBuf, reason: String },

    #[error("Pipeline config template references unknown parameter: {key}")]
    TemplateRenderError { key: String },

    #[error("Input directory is missing {0}")]
    InputLayout(PathBuf),

    #[error("Text format parse error at line {line}: {reason}")]
    PbtxtParse { line: usize, reason: String },

    #[error("Detector is {current}, cannot {action}")]
    InvalidState {
        current: &'static str,
        action: &'static str,
    },

    // Launch errors
    #[error("Failed to launch training process: {command}")]
    LaunchFailure {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TpodError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache population error
    pub fn download(key: &str, url: &str, reason: impl Into<String>) -> Self {
        Self::CacheDownloadFailure {
            key: key.to_string(),
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a label map error
    pub fn label_map(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LabelMapError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's request rather than the system
    ///
    /// The outer API layer maps these to "not found" / "bad request" responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProviderType(_)
                | Self::MissingRequiredParameter(_)
                | Self::InvalidParameter { .. }
                | Self::LabelMapError { .. }
                | Self::InputLayout(_)
                | Self::InvalidState { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownProviderType(_) => Some("Run: tpod types"),
            Self::MissingRequiredParameter(_) => {
                Some("Pass it with --param KEY=VALUE (see: tpod describe <type>)")
            }
            Self::InvalidParameter { .. } => Some("See defaults with: tpod describe <type>"),
            Self::CheckpointNotFound(_) => {
                Some("Remove the cache entry with: tpod cache clear, then retry")
            }
            Self::CacheDownloadFailure { .. } => Some("Check network access and retry"),
            Self::LaunchFailure { .. } => {
                Some("Check [trainer] program in config: tpod config show")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TpodError::MissingRequiredParameter("batch_size".to_string());
        assert_eq!(
            err.to_string(),
            "Parameter (batch_size) is required, but not given"
        );
    }

    #[test]
    fn error_hint() {
        let err = TpodError::UnknownProviderType("yolo".to_string());
        assert_eq!(err.hint(), Some("Run: tpod types"));
    }

    #[test]
    fn client_errors() {
        assert!(TpodError::UnknownProviderType("x".to_string()).is_client_error());
        assert!(TpodError::InvalidParameter {
            key: "batch_size".to_string(),
            expected: "an integer".to_string(),
            value: "x".to_string(),
        }
        .is_client_error());
        assert!(!TpodError::RegistrationConflict("x".to_string()).is_client_error());
        assert!(!TpodError::CheckpointNotFound(PathBuf::from("/c")).is_client_error());
    }
}
