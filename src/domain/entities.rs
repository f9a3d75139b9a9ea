use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::clients::{ClientId, ClientPatch, NewClient};

/// Persisted client snapshot. The same JSON shape is used for cache entries
/// and HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ClientRecord {
    /// Assign identity and timestamps before the record reaches the store.
    pub fn new(client: NewClient) -> Self {
        let now = OffsetDateTime::now_utc();
        let NewClient { name, email, phone } = client;
        Self {
            id: ClientId::generate(),
            name,
            email,
            phone,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &ClientPatch, now: OffsetDateTime) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.clone();
        }
        if let Some(email) = patch.email.as_ref() {
            self.email = email.clone();
        }
        if let Some(phone) = patch.phone.as_ref() {
            self.phone = phone.clone();
        }
        self.updated_at = now;
    }
}
