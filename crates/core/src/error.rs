//! Error types for Cloudroid
//!
//! Centralized error handling for the shared layer using thiserror.

use thiserror::Error;

/// Main error type for the shared layer
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for shared-layer operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Io(e) => format!("File operation failed: {}", e),
            CoreError::Config(msg) => format!("Configuration error: {}", msg),
            CoreError::TomlParse(e) => format!("Configuration file is not valid TOML: {}", e),
            _ => self.to_string(),
        }
    }
}
