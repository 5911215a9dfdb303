// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Note: running out of tokens is NOT an error. `AdmissionPolicy::try_acquire`
/// reports it as `false`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
