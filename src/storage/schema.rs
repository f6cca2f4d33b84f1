//! Schema Management
//!
//! Guarantees the key-value table and its expiry index exist before the
//! store serves its first request, and pre-formats the statements the store
//! runs against that table.
//!
//! ## Table Shape
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS <table> (
//!     key    TEXT PRIMARY KEY NOT NULL DEFAULT '',
//!     value  BLOB NOT NULL,
//!     expiry INTEGER NOT NULL DEFAULT 0
//! );
//! CREATE INDEX IF NOT EXISTS <table>_expiry_idx ON <table> (expiry);
//! ```
//!
//! `expiry` is a Unix timestamp in seconds; `0` means the row never expires.
//! The index keeps the garbage collector's bulk delete from scanning the
//! whole table.
//!
//! The table name is interpolated, not bound as a parameter (SQL does not
//! allow parameterized identifiers). The caller is trusted to supply a safe
//! identifier; see `Config::table`. The index name is derived from the table
//! name so two stores in the same database never fight over it.

use libsql::Connection;
use tracing::debug;

use crate::error::StorageError;

const DROP_TABLE: &str = "DROP TABLE IF EXISTS {table}";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS {table} (
    key    TEXT PRIMARY KEY NOT NULL DEFAULT '',
    value  BLOB NOT NULL,
    expiry INTEGER NOT NULL DEFAULT 0
)";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS {table}_expiry_idx ON {table} (expiry)";

/// The DML statements the store runs, formatted once per table name.
#[derive(Debug, Clone)]
pub(crate) struct Queries {
    /// `SELECT value, expiry FROM <table> WHERE key = ?`
    pub get: String,
    /// `INSERT OR REPLACE INTO <table> (key, value, expiry) VALUES (?, ?, ?)`
    pub set: String,
    /// `DELETE FROM <table> WHERE key = ?`
    pub delete: String,
    /// `DELETE FROM <table>`
    pub reset: String,
    /// `DELETE FROM <table> WHERE expiry <= ? AND expiry != 0`
    pub gc: String,
}

impl Queries {
    pub(crate) fn for_table(table: &str) -> Self {
        Self {
            get: format!("SELECT value, expiry FROM {table} WHERE key = ?"),
            set: format!("INSERT OR REPLACE INTO {table} (key, value, expiry) VALUES (?, ?, ?)"),
            delete: format!("DELETE FROM {table} WHERE key = ?"),
            reset: format!("DELETE FROM {table}"),
            gc: format!("DELETE FROM {table} WHERE expiry <= ? AND expiry != 0"),
        }
    }
}

/// Ensures the table and its expiry index exist.
///
/// With `reset` set, the table is dropped first. Every statement is
/// idempotent (`IF EXISTS` / `IF NOT EXISTS`), so calling this twice is
/// harmless. Any DDL failure aborts store construction.
pub(crate) async fn init(
    conn: &Connection,
    table: &str,
    reset: bool,
) -> Result<(), StorageError> {
    if reset {
        conn.execute(&DROP_TABLE.replace("{table}", table), ())
            .await
            .map_err(StorageError::Schema)?;
        debug!(table, "dropped existing table");
    }

    for ddl in [CREATE_TABLE, CREATE_INDEX] {
        conn.execute(&ddl.replace("{table}", table), ())
            .await
            .map_err(StorageError::Schema)?;
    }
    debug!(table, "schema ready");

    Ok(())
}
