//! v001 -- Initial schema creation.
//!
//! A single key/value table. The client keeps exactly one row in it today
//! (the cached message list) but the table is not specific to messages.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,               -- serialized payload
    updated_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
