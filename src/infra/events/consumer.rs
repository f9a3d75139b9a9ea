//! Subscribes to the client topics and logs each notification.

use std::future::Future;

use metrics::counter;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::application::events::{
    CLIENT_CREATED, CLIENT_DELETED, CLIENT_TOPICS, CLIENT_UPDATED, ClientEventNotice,
};
use crate::infra::error::InfraError;

use super::memory::BusMessage;

const SOURCE: &str = "infra::events::consumer";

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),
    #[error("malformed `{topic}` payload: {source}")]
    Malformed {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClientEventsConsumer;

impl ClientEventsConsumer {
    pub fn new() -> Self {
        Self
    }

    pub fn topics(&self) -> &'static [&'static str] {
        &CLIENT_TOPICS
    }

    /// Decode and log one notification.
    pub fn handle(&self, topic: &str, payload: &str) -> Result<ClientEventNotice, ConsumeError> {
        let topic = CLIENT_TOPICS
            .iter()
            .copied()
            .find(|known| *known == topic)
            .ok_or_else(|| ConsumeError::UnknownTopic(topic.to_string()))?;

        let notice: ClientEventNotice = serde_json::from_str(payload)
            .map_err(|source| ConsumeError::Malformed { topic, source })?;

        counter!("roster_events_consumed_total", "topic" => topic).increment(1);
        match topic {
            CLIENT_CREATED => info!(
                target = SOURCE,
                client_id = %notice.id,
                name = notice.name.as_deref().unwrap_or(""),
                "client created"
            ),
            CLIENT_UPDATED => info!(
                target = SOURCE,
                client_id = %notice.id,
                name = notice.name.as_deref().unwrap_or(""),
                "client updated"
            ),
            CLIENT_DELETED => info!(target = SOURCE, client_id = %notice.id, "client deleted"),
            _ => {}
        }
        Ok(notice)
    }

    fn handle_logged(&self, topic: &str, payload: &str) {
        if let Err(err) = self.handle(topic, payload) {
            warn!(target = SOURCE, topic, error = %err, "skipping client event");
        }
    }
}

/// Consume `LISTEN` notifications until `shutdown` resolves.
pub async fn run_pg_listener<F>(
    pool: &PgPool,
    consumer: ClientEventsConsumer,
    shutdown: F,
) -> Result<(), InfraError>
where
    F: Future<Output = ()>,
{
    let mut listener = PgListener::connect_with(pool)
        .await
        .map_err(|err| InfraError::listener(err.to_string()))?;
    listener
        .listen_all(consumer.topics().iter().copied())
        .await
        .map_err(|err| InfraError::listener(err.to_string()))?;

    info!(target = SOURCE, topics = ?consumer.topics(), "listening for client events");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = listener.recv() => {
                let notification =
                    received.map_err(|err| InfraError::listener(err.to_string()))?;
                consumer.handle_logged(notification.channel(), notification.payload());
            }
        }
    }

    info!(target = SOURCE, "client event listener stopped");
    Ok(())
}

/// Consume the in-process bus until `shutdown` resolves or the bus closes.
pub async fn run_bus_listener<F>(
    mut receiver: broadcast::Receiver<BusMessage>,
    consumer: ClientEventsConsumer,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = receiver.recv() => match received {
                Ok(message) => {
                    consumer.handle_logged(&message.topic, &message.payload.to_string());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target = SOURCE, skipped, "client event consumer lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use serde_json::json;

    use crate::application::events::EventPublisher;
    use crate::infra::events::InProcessEventBus;

    #[test]
    fn handle_decodes_known_topics() {
        let consumer = ClientEventsConsumer::new();

        let created = consumer
            .handle("client.created", r#"{"id":"1","name":"Ana"}"#)
            .expect("created");
        assert_eq!(created.name.as_deref(), Some("Ana"));

        let deleted = consumer
            .handle("client.deleted", r#"{"id":"1"}"#)
            .expect("deleted");
        assert_eq!(deleted.id, "1");
    }

    #[test]
    fn handle_rejects_unknown_topics_and_bad_payloads() {
        let consumer = ClientEventsConsumer::new();

        assert!(matches!(
            consumer.handle("orders.created", "{}"),
            Err(ConsumeError::UnknownTopic(_))
        ));
        assert!(matches!(
            consumer.handle("client.updated", "not json"),
            Err(ConsumeError::Malformed { topic: "client.updated", .. })
        ));
    }

    #[tokio::test]
    async fn bus_listener_stops_when_the_bus_closes() {
        let bus = Arc::new(InProcessEventBus::new(
            NonZeroUsize::new(8).expect("capacity"),
        ));
        let receiver = bus.subscribe();

        bus.publish("client.created", &json!({ "id": "1", "name": "Ana" }))
            .await
            .expect("publish");
        drop(bus);

        run_bus_listener(
            receiver,
            ClientEventsConsumer::new(),
            std::future::pending(),
        )
        .await;
    }
}
