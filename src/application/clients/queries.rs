use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::application::cache::{CacheKey, CacheLookup};
use crate::domain::clients::ClientId;
use crate::domain::entities::ClientRecord;

use super::service::ClientService;
use super::types::ClientServiceError;

const SOURCE: &str = "application::clients::queries";

impl ClientService {
    /// Cache-first lookup. `Ok(None)` when the store has no such client.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ClientRecord>, ClientServiceError> {
        let id = ClientId::parse(id)?;
        let key = CacheKey::client(&id);

        if let Some(record) = self.read_cached::<ClientRecord>(&key).await {
            return Ok(Some(record));
        }

        let Some(record) = self.reader.find_by_id(&id).await? else {
            return Ok(None);
        };

        self.backfill(&key, &record).await;
        Ok(Some(record))
    }

    pub async fn list(&self) -> Result<Vec<ClientRecord>, ClientServiceError> {
        let key = CacheKey::AllClients;

        if let Some(records) = self.read_cached::<Vec<ClientRecord>>(&key).await {
            return Ok(records);
        }

        let records = self.reader.find_all().await?;
        self.backfill(&key, &records).await;
        Ok(records)
    }

    // Any cache failure reads as a miss.
    async fn read_cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.get(key).await {
            CacheLookup::Found(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!("roster_cache_hit_total").increment(1);
                    debug!(target = SOURCE, cache_key = %key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    counter!("roster_cache_error_total", "op" => "decode").increment(1);
                    warn!(
                        target = SOURCE,
                        cache_key = %key,
                        error = %err,
                        "discarding malformed cache entry"
                    );
                    None
                }
            },
            CacheLookup::Absent => {
                counter!("roster_cache_miss_total").increment(1);
                debug!(target = SOURCE, cache_key = %key, "cache miss");
                None
            }
            CacheLookup::Failed(err) => {
                counter!("roster_cache_error_total", "op" => "get").increment(1);
                warn!(
                    target = SOURCE,
                    cache_key = %key,
                    error = %err,
                    "cache read failed; falling back to store"
                );
                None
            }
        }
    }

    async fn backfill<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target = SOURCE, cache_key = %key, error = %err, "failed to encode cache entry");
                return;
            }
        };

        if let Err(err) = self.cache.set(key, payload, self.ttl).await {
            counter!("roster_cache_error_total", "op" => "set").increment(1);
            warn!(
                target = SOURCE,
                cache_key = %key,
                error = %err,
                "cache backfill failed"
            );
        }
    }
}
