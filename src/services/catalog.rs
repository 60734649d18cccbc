use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::ServiceSummary;

/// Read-only access to the salon's service catalog.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn find(&self, id: &str) -> anyhow::Result<Option<ServiceSummary>>;
}

/// Catalog backed by the `services` table of the booking database.
pub struct SqliteServiceCatalog {
    db: Arc<Mutex<Connection>>,
}

impl SqliteServiceCatalog {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ServiceCatalog for SqliteServiceCatalog {
    async fn find(&self, id: &str) -> anyhow::Result<Option<ServiceSummary>> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        queries::get_service(&db, id)
    }
}
