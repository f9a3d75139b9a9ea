use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::application::events::{EventPublisher, PublishError};

/// Publishes through `pg_notify`, one channel per topic.
///
/// The pool is owned by bootstrap; this type never opens connections itself.
#[derive(Clone)]
pub struct PgNotifyPublisher {
    pool: PgPool,
}

impl PgNotifyPublisher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventPublisher for PgNotifyPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), PublishError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(topic)
            .bind(payload.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db) => PublishError::rejected(topic, db.message()),
                other => PublishError::Unavailable(other.to_string()),
            })?;

        info!(topic, payload = %payload, "client event published");
        Ok(())
    }
}
