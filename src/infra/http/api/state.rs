use std::sync::Arc;

use crate::application::clients::ClientService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub clients: Arc<ClientService>,
    /// Present only when the Postgres store is active.
    pub db: Option<Arc<PostgresRepositories>>,
}

impl ApiState {
    pub fn new(clients: Arc<ClientService>) -> Self {
        Self { clients, db: None }
    }

    pub fn with_database(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
