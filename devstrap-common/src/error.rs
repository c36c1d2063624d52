// devstrap-common/src/error.rs

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DevstrapError {
    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Dependency Error: {0}")]
    Dependency(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Detection Error: {0}")]
    Detection(String),

    #[error("Resolution Error: {0}")]
    Resolution(String),

    #[error("Planning Error: {0}")]
    Planning(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<semver::Error> for DevstrapError {
    fn from(err: semver::Error) -> Self {
        DevstrapError::SemVer(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DevstrapError>;
