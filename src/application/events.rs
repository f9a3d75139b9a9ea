//! Event publisher port and the client event catalogue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::clients::ClientId;
use crate::domain::entities::ClientRecord;

pub const CLIENT_CREATED: &str = "client.created";
pub const CLIENT_UPDATED: &str = "client.updated";
pub const CLIENT_DELETED: &str = "client.deleted";

pub const CLIENT_TOPICS: [&str; 3] = [CLIENT_CREATED, CLIENT_UPDATED, CLIENT_DELETED];

/// Notification of a committed change to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Created { id: ClientId, name: String },
    Updated { id: ClientId, name: String },
    Deleted { id: ClientId },
}

impl ClientEvent {
    pub fn created(record: &ClientRecord) -> Self {
        Self::Created {
            id: record.id.clone(),
            name: record.name.clone(),
        }
    }

    pub fn updated(record: &ClientRecord) -> Self {
        Self::Updated {
            id: record.id.clone(),
            name: record.name.clone(),
        }
    }

    pub fn deleted(record: &ClientRecord) -> Self {
        Self::Deleted {
            id: record.id.clone(),
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            ClientEvent::Created { .. } => CLIENT_CREATED,
            ClientEvent::Updated { .. } => CLIENT_UPDATED,
            ClientEvent::Deleted { .. } => CLIENT_DELETED,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ClientEvent::Created { id, name } | ClientEvent::Updated { id, name } => {
                json!({ "id": id, "name": name })
            }
            ClientEvent::Deleted { id } => json!({ "id": id }),
        }
    }
}

/// Decoded form of an event received from the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEventNotice {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker rejected `{topic}`: {message}")]
    Rejected { topic: String, message: String },
}

impl PublishError {
    pub fn rejected(topic: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            topic: topic.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Resolves once the broker has accepted the message.
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), PublishError>;
}
