//! [`DurableCache`] over the SQLite store.

use std::sync::{Arc, Mutex};

use chatter_shared::{CacheError, Message, MessageList};
use chatter_store::Database;

use crate::adapters::DurableCache;

/// SQLite-backed cache. rusqlite is blocking, so every call runs on the
/// blocking pool.
#[derive(Clone)]
pub struct SqliteCache {
    db: Arc<Mutex<Database>>,
}

impl SqliteCache {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Share a database handle the caller also uses.
    pub fn shared(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, CacheError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| CacheError::Storage(format!("Lock poisoned: {e}")))?;
            f(&guard)
        })
        .await
        .map_err(|e| CacheError::TaskFailed(e.to_string()))?
    }
}

impl DurableCache for SqliteCache {
    async fn save(&self, messages: MessageList) -> Result<(), CacheError> {
        self.with_db(move |db| db.save_messages(&messages).map_err(CacheError::from))
            .await
    }

    async fn load(&self) -> Result<Vec<Message>, CacheError> {
        self.with_db(|db| db.load_messages().map_err(CacheError::from))
            .await
    }
}
