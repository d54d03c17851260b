//! Error types for capbuild core
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Atomic write failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Io(e) => format!("File operation failed: {}", e),
            CoreError::TomlParse(e) => format!("Invalid {}: {}", crate::CONFIG_FILE_NAME, e),
            CoreError::Config(msg) => format!("Configuration error: {}", msg),
            CoreError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}
