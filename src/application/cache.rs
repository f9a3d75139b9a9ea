//! Cache port and key namespace.
//!
//! Every key the client service reads, writes, or invalidates is produced by
//! [`CacheKey`]; adapters only ever see the rendered string.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::clients::ClientId;

/// Time-to-live applied to every backfilled entry unless configured otherwise.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

const CLIENT_PREFIX: &str = "client:";
const ALL_CLIENTS: &str = "clients:all";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// One serialized client, `client:{id}`.
    Client(ClientId),
    /// The serialized full list, `clients:all`.
    AllClients,
}

impl CacheKey {
    pub fn client(id: &ClientId) -> Self {
        Self::Client(id.clone())
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Client(id) => write!(f, "{CLIENT_PREFIX}{id}"),
            CacheKey::AllClients => f.write_str(ALL_CLIENTS),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation `{op}` failed: {message}")]
    Operation { op: &'static str, message: String },
}

impl CacheError {
    pub fn operation(op: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            op,
            message: message.into(),
        }
    }
}

/// Outcome of a cache read. A miss is not an error.
#[derive(Debug)]
pub enum CacheLookup {
    Found(String),
    Absent,
    Failed(CacheError),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> CacheLookup;

    /// Overwrites any existing value and resets its TTL.
    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_into_the_shared_namespace() {
        let id = ClientId::parse("client_123").expect("id");
        assert_eq!(CacheKey::client(&id).render(), "client:client_123");
        assert_eq!(CacheKey::AllClients.render(), "clients:all");
    }

    #[test]
    fn special_characters_pass_through_unescaped() {
        let id = ClientId::parse("client-123_@#$%").expect("id");
        assert_eq!(CacheKey::client(&id).render(), "client:client-123_@#$%");
    }

    #[test]
    fn default_ttl_is_five_minutes() {
        assert_eq!(DEFAULT_CACHE_TTL.as_secs(), 300);
    }
}
