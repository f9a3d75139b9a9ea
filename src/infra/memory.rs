//! Process-local client store used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{ClientsRepo, ClientsWriteRepo, RepoError};
use crate::domain::clients::{ClientId, ClientPatch};
use crate::domain::entities::ClientRecord;

const EMAIL_CONSTRAINT: &str = "clients_email_key";

#[derive(Default)]
pub struct InMemoryClientsRepo {
    records: RwLock<HashMap<ClientId, ClientRecord>>,
}

impl InMemoryClientsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    fn email_taken(
        records: &HashMap<ClientId, ClientRecord>,
        email: &str,
        except: Option<&ClientId>,
    ) -> bool {
        records
            .values()
            .any(|record| record.email == email && Some(&record.id) != except)
    }
}

#[async_trait]
impl ClientsRepo for InMemoryClientsRepo {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<ClientRecord>, RepoError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ClientRecord>, RepoError> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(records)
    }
}

#[async_trait]
impl ClientsWriteRepo for InMemoryClientsRepo {
    async fn create(&self, record: ClientRecord) -> Result<ClientRecord, RepoError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(RepoError::Duplicate {
                constraint: "clients_pkey".to_string(),
            });
        }
        if Self::email_taken(&records, &record.email, None) {
            return Err(RepoError::Duplicate {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &ClientId, patch: ClientPatch) -> Result<ClientRecord, RepoError> {
        let mut records = self.records.write().await;
        if let Some(email) = patch.email.as_deref()
            && Self::email_taken(&records, email, Some(id))
        {
            return Err(RepoError::Duplicate {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }

        let record = records.get_mut(id).ok_or(RepoError::NotFound)?;
        record.apply(&patch, OffsetDateTime::now_utc());
        Ok(record.clone())
    }

    async fn delete(&self, id: &ClientId) -> Result<ClientRecord, RepoError> {
        self.records
            .write()
            .await
            .remove(id)
            .ok_or(RepoError::NotFound)
    }
}
