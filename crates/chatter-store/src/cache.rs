use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use chatter_shared::constants::MESSAGE_CACHE_KEY;
use chatter_shared::Message;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Overwrite `key` with `value`.
    pub fn put_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM kv_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn delete_value(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM kv_cache WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// When `key` was last written, if ever.
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT updated_at FROM kv_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    /// Replace the cached message list.
    pub fn save_messages(&self, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        self.put_value(MESSAGE_CACHE_KEY, &json)?;
        tracing::debug!(count = messages.len(), bytes = json.len(), "message cache written");
        Ok(())
    }

    /// Read the cached message list in the order it was saved.
    ///
    /// An unset key or a blob that no longer decodes yields an empty list;
    /// only storage failures are errors.
    pub fn load_messages(&self) -> Result<Vec<Message>> {
        let Some(json) = self.get_value(MESSAGE_CACHE_KEY)? else {
            tracing::debug!("message cache is empty");
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Message>>(&json) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                tracing::warn!(error = %e, "message cache is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}
