use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    ConfigError(String),
    ValidationError(String),
    HttpError(String),
    AuthError(String),
    StorageError(String),
    WorkflowError(String),
    ParseError(String),
    IoError(String),
}

impl AppError {
    /// The underlying message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::ConfigError(msg)
            | AppError::ValidationError(msg)
            | AppError::HttpError(msg)
            | AppError::AuthError(msg)
            | AppError::StorageError(msg)
            | AppError::WorkflowError(msg)
            | AppError::ParseError(msg)
            | AppError::IoError(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            AppError::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::WorkflowError(msg) => write!(f, "Workflow error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
