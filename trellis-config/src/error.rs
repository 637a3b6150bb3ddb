// Configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to load configuration from {source_name}: {message}")]
    Load {
        source_name: String,
        message: String,
    },

    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Invalid value for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Configuration key `{key}` is not a valid {expected}")]
    Type { key: String, expected: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
