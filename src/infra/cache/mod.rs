//! Cache adapters behind [`crate::application::cache::CacheStore`].

mod lock;
mod lru_store;

pub(crate) use lock::mutex_lock;
pub use lru_store::{DisabledCache, LruTtlCache};
