// ABOUTME: Application-wide error taxonomy for stagehand.
// ABOUTME: Classifies failures so callers can map them to stable response codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::EnvironmentError;
use crate::deploy::LogError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorised: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid options: {0}")]
    Validation(String),

    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("deployment log error: {0}")]
    Log(#[from] LogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<EnvironmentError> for Error {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::UnknownEnvironment(name) => {
                Error::NotFound(format!("environment {name} does not exist"))
            }
            EnvironmentError::UnknownRevision(reference) => {
                Error::Validation(format!("revision {reference} cannot be resolved"))
            }
            EnvironmentError::Unreachable(cause) => {
                Error::Dependency(format!("environment backend unreachable: {cause}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
