//! Store ports describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::clients::{ClientId, ClientPatch};
use crate::domain::entities::ClientRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ClientsRepo: Send + Sync {
    /// Absence is `Ok(None)`, never `RepoError::NotFound`.
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<ClientRecord>, RepoError>;

    /// Order is adapter-defined.
    async fn find_all(&self) -> Result<Vec<ClientRecord>, RepoError>;
}

#[async_trait]
pub trait ClientsWriteRepo: Send + Sync {
    async fn create(&self, record: ClientRecord) -> Result<ClientRecord, RepoError>;

    /// Returns the post-update snapshot, or `RepoError::NotFound`.
    async fn update(&self, id: &ClientId, patch: ClientPatch) -> Result<ClientRecord, RepoError>;

    /// Returns the removed snapshot, or `RepoError::NotFound`.
    async fn delete(&self, id: &ClientId) -> Result<ClientRecord, RepoError>;
}
