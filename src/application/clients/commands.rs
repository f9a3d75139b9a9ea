use metrics::counter;
use tracing::{info, warn};

use crate::application::cache::CacheKey;
use crate::application::events::ClientEvent;
use crate::domain::clients::{ClientId, ClientPatch, NewClient};
use crate::domain::entities::ClientRecord;

use super::service::ClientService;
use super::types::{ClientServiceError, SideEffectPolicy, WriteStep};

const SOURCE: &str = "application::clients::commands";

// Every write runs store, then publish, then invalidate. A committed store
// change is never rolled back.
impl ClientService {
    pub async fn create(&self, client: NewClient) -> Result<ClientRecord, ClientServiceError> {
        let record = ClientRecord::new(client);
        let created = self.writer.create(record).await?;

        self.publish(ClientEvent::created(&created)).await?;
        self.invalidate(&[CacheKey::AllClients]).await?;

        info!(
            target = SOURCE,
            client_id = %created.id,
            "client created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        patch: ClientPatch,
    ) -> Result<ClientRecord, ClientServiceError> {
        let id = ClientId::parse(id)?;
        let updated = self.writer.update(&id, patch).await?;

        self.publish(ClientEvent::updated(&updated)).await?;
        self.invalidate(&[CacheKey::client(&id), CacheKey::AllClients])
            .await?;

        info!(target = SOURCE, client_id = %id, "client updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<ClientRecord, ClientServiceError> {
        let id = ClientId::parse(id)?;
        let deleted = self.writer.delete(&id).await?;

        self.publish(ClientEvent::deleted(&deleted)).await?;
        self.invalidate(&[CacheKey::client(&deleted.id), CacheKey::AllClients])
            .await?;

        info!(target = SOURCE, client_id = %deleted.id, "client deleted");
        Ok(deleted)
    }

    async fn publish(&self, event: ClientEvent) -> Result<(), ClientServiceError> {
        let topic = event.topic();
        match self.events.publish(topic, &event.payload()).await {
            Ok(()) => {
                counter!("roster_events_published_total", "topic" => topic).increment(1);
                Ok(())
            }
            Err(err) => self.side_effect_failed(WriteStep::Publish, topic, err.into()),
        }
    }

    async fn invalidate(&self, keys: &[CacheKey]) -> Result<(), ClientServiceError> {
        for key in keys {
            if let Err(err) = self.cache.delete(key).await {
                self.side_effect_failed(WriteStep::Invalidate, &key.render(), err.into())?;
            }
        }
        Ok(())
    }

    fn side_effect_failed(
        &self,
        step: WriteStep,
        subject: &str,
        error: ClientServiceError,
    ) -> Result<(), ClientServiceError> {
        counter!("roster_side_effect_failures_total", "step" => step.as_str()).increment(1);
        match self.policy {
            SideEffectPolicy::Surface => Err(error),
            SideEffectPolicy::Swallow => {
                warn!(
                    target = SOURCE,
                    step = step.as_str(),
                    subject,
                    error = %error,
                    "write side effect failed after store commit; continuing"
                );
                Ok(())
            }
        }
    }
}
