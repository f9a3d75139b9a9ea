use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ClientsRepo, ClientsWriteRepo, RepoError},
    domain::clients::{ClientId, ClientPatch},
    domain::entities::ClientRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const CLIENT_COLUMNS: &str = "id, name, email, phone, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ClientRow> for ClientRecord {
    fn from(row: ClientRow) -> Self {
        Self {
            id: ClientId::from_stored(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ClientsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<ClientRecord>, RepoError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ClientRecord::from))
    }

    async fn find_all(&self) -> Result<Vec<ClientRecord>, RepoError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ClientRecord::from).collect())
    }
}

#[async_trait]
impl ClientsWriteRepo for PostgresRepositories {
    async fn create(&self, record: ClientRecord) -> Result<ClientRecord, RepoError> {
        let sql = format!(
            "INSERT INTO clients ({CLIENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {CLIENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(record.id.as_str())
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update(&self, id: &ClientId, patch: ClientPatch) -> Result<ClientRecord, RepoError> {
        let sql = format!(
            "UPDATE clients SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone = COALESCE($4, phone), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {CLIENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.as_str())
            .bind(patch.name)
            .bind(patch.email)
            .bind(patch.phone)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ClientRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: &ClientId) -> Result<ClientRecord, RepoError> {
        let sql = format!("DELETE FROM clients WHERE id = $1 RETURNING {CLIENT_COLUMNS}");
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ClientRecord::from).ok_or(RepoError::NotFound)
    }
}
