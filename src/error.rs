use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Dataset schema violations (missing column, malformed row), fatal at load
    #[error("Schema error: {0}")]
    Schema(String),

    /// No persisted model for the requested business group
    #[error("Unknown business group: {0}")]
    UnknownBusinessGroup(String),

    /// Jurisdiction absent from the fit-time vocabulary
    #[error("Unknown jurisdiction: {0}")]
    UnknownCategory(String),

    /// Encoder or model blob absent or corrupt on load
    #[error("Artifact missing or unreadable: {0}")]
    ArtifactMissing(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal errors (numerical fit failures and the like)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Schema(_) => "SCHEMA_ERROR",
            AppError::UnknownBusinessGroup(_) => "UNKNOWN_BUSINESS_GROUP",
            AppError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            AppError::ArtifactMissing(_) => "ARTIFACT_MISSING",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io_err) => AppError::Io(io_err),
                other => AppError::Schema(format!("{:?}", other)),
            }
        } else {
            AppError::Schema(err.to_string())
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
