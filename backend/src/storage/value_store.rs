use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::traits::ConfigStore;
use crate::db::DbConnection;

/// Application settings kept in the `key_values` table
#[derive(Clone)]
pub struct ValueStore {
    db: DbConnection,
}

impl ValueStore {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigStore for ValueStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        debug!("Getting value for key: {}", key);
        self.db.get_value(key).await
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        debug!("Setting value for key: {}", key);
        self.db.put_value(key, value).await
    }
}
