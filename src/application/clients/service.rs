use std::sync::Arc;
use std::time::Duration;

use crate::application::cache::{CacheStore, DEFAULT_CACHE_TTL};
use crate::application::events::EventPublisher;
use crate::application::repos::{ClientsRepo, ClientsWriteRepo};

use super::types::SideEffectPolicy;

/// Orchestrates the store, cache, and event publisher for client operations.
#[derive(Clone)]
pub struct ClientService {
    pub(crate) reader: Arc<dyn ClientsRepo>,
    pub(crate) writer: Arc<dyn ClientsWriteRepo>,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) events: Arc<dyn EventPublisher>,
    pub(crate) ttl: Duration,
    pub(crate) policy: SideEffectPolicy,
}

impl ClientService {
    pub fn new(
        reader: Arc<dyn ClientsRepo>,
        writer: Arc<dyn ClientsWriteRepo>,
        cache: Arc<dyn CacheStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            events,
            ttl: DEFAULT_CACHE_TTL,
            policy: SideEffectPolicy::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_side_effect_policy(mut self, policy: SideEffectPolicy) -> Self {
        self.policy = policy;
        self
    }
}
