use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::application::cache::CacheError;
use crate::application::error::ErrorKind;
use crate::application::events::PublishError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ClientServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl ClientServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientServiceError::Domain(DomainError::Validation { .. }) => ErrorKind::Validation,
            ClientServiceError::Repo(RepoError::NotFound) => ErrorKind::NotFound,
            ClientServiceError::Repo(RepoError::Duplicate { .. }) => ErrorKind::Conflict,
            ClientServiceError::Repo(RepoError::InvalidInput { .. }) => ErrorKind::Validation,
            ClientServiceError::Repo(RepoError::Persistence(_) | RepoError::Timeout) => {
                ErrorKind::Infrastructure
            }
            ClientServiceError::Cache(_) | ClientServiceError::Publish(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

/// How a write reacts when publishing or cache invalidation fails after the
/// store has committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SideEffectPolicy {
    /// Abort the remaining steps and return the error.
    #[default]
    Surface,
    /// Log and count the failure, run the remaining steps, return the entity.
    Swallow,
}

impl SideEffectPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SideEffectPolicy::Surface => "surface",
            SideEffectPolicy::Swallow => "swallow",
        }
    }
}

impl fmt::Display for SideEffectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SideEffectPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "surface" => Ok(SideEffectPolicy::Surface),
            "swallow" => Ok(SideEffectPolicy::Swallow),
            other => Err(format!(
                "unknown side effect policy `{other}`, expected `surface` or `swallow`"
            )),
        }
    }
}

/// Write-path step labels used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteStep {
    Publish,
    Invalidate,
}

impl WriteStep {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            WriteStep::Publish => "publish",
            WriteStep::Invalidate => "invalidate",
        }
    }
}
