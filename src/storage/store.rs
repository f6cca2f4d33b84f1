//! The Key-Value Store
//!
//! [`Storage`] owns the database connection for its whole lifetime, serves
//! `get`/`set`/`delete`/`reset`, and runs the garbage collector. One
//! instance is meant to be shared across tasks (wrap it in an `Arc` or hand
//! out clones of the connection); `libsql::Connection` is internally
//! synchronized and the store adds no locking of its own.
//!
//! ## Expiration Model
//!
//! Expiry is a Unix timestamp in whole seconds stored next to the value;
//! `0` means "never expires". Reads apply the check lazily: a row whose
//! expiry has passed is reported as absent but left in place. Physical
//! removal is the garbage collector's job exclusively, which keeps the read
//! path a single side-effect-free statement.
//!
//! ## Lifecycle
//!
//! `Storage::new` validates the configuration, opens and pings the
//! database, initializes the schema and spawns the collector. Any failure
//! on that path returns an error and releases whatever was already
//! acquired. [`Storage::close`] consumes the store, so closing twice or
//! using a closed store is rejected at compile time; a store that is simply
//! dropped still stops its collector task, it just does not wait for the
//! task to finish.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use libsql::{params, Connection, Database};
use tracing::info;

use super::gc::{GcCounters, GcStats, GcTask};
use super::schema::{self, Queries};
use crate::config::Config;
use crate::error::StorageError;

/// Current Unix time in whole seconds.
pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// An expiring key-value store backed by a libSQL database.
///
/// # Example
///
/// ```no_run
/// use libsql_store::{Config, Storage};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), libsql_store::StorageError> {
/// let storage = Storage::new(Config::default()).await?;
///
/// storage.set("session:1", Bytes::from("data"), Duration::from_secs(3600)).await?;
/// let value = storage.get("session:1").await?;
/// assert_eq!(value, Some(Bytes::from("data")));
///
/// storage.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Storage {
    /// Kept alive for the lifetime of the store; embedded replicas sync
    /// through it.
    db: Database,
    conn: Connection,
    sql: Queries,
    gc: Option<GcTask>,
    gc_counters: Arc<GcCounters>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("gc_stats", &self.gc_counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Opens the store described by `config`.
    ///
    /// Validates the configuration, opens the database, pings it, ensures
    /// the schema exists (dropping the table first when `config.reset` is
    /// set) and starts the garbage collector. On any failure the error is
    /// returned and everything acquired so far is released; there is no
    /// partially-initialized store.
    pub async fn new(config: Config) -> Result<Self, StorageError> {
        let config = config.normalized()?;

        let db = config.connection.open().await.map_err(StorageError::Connect)?;
        let conn = db.connect().map_err(StorageError::Connect)?;

        // Surface bad paths and credentials before touching the schema.
        conn.query("SELECT 1", ())
            .await
            .map_err(StorageError::Connect)?;

        schema::init(&conn, &config.table, config.reset).await?;

        let sql = Queries::for_table(&config.table);
        let gc_counters = Arc::new(GcCounters::default());
        let gc = GcTask::spawn(
            conn.clone(),
            sql.gc.clone(),
            config.gc_interval,
            Arc::clone(&gc_counters),
        );

        info!(table = %config.table, "storage opened");

        Ok(Self {
            db,
            conn,
            sql,
            gc: Some(gc),
            gc_counters,
        })
    }

    /// Returns the value stored under `key`.
    ///
    /// An empty key, a missing row and an expired row all report as
    /// `Ok(None)`; none of them is an error. Expired rows are not deleted
    /// here, only hidden.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        if key.is_empty() {
            return Ok(None);
        }

        let mut rows = self
            .conn
            .query(&self.sql.get, params![key])
            .await
            .map_err(StorageError::Query)?;

        let Some(row) = rows.next().await.map_err(StorageError::Query)? else {
            return Ok(None);
        };

        let value: Vec<u8> = row.get(0).map_err(StorageError::Query)?;
        let expiry: i64 = row.get(1).map_err(StorageError::Query)?;

        if expiry != 0 && expiry <= now_unix() {
            return Ok(None);
        }

        Ok(Some(Bytes::from(value)))
    }

    /// Stores `value` under `key`, replacing any previous value and expiry.
    ///
    /// A zero `ttl` means the entry never expires; otherwise it expires
    /// `ttl` from now, truncated to whole seconds.
    ///
    /// An empty key or an empty value is a silent no-op: zero-length values
    /// cannot be stored, and `get` cannot distinguish "stored empty" from
    /// "absent" anyway.
    pub async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StorageError> {
        if key.is_empty() || value.is_empty() {
            return Ok(());
        }

        // Saturate instead of wrapping: an absurdly large ttl must degrade to
        // "effectively never expires", not to a negative expiry in the past.
        let expiry = if ttl.is_zero() {
            0
        } else {
            now_unix().saturating_add(ttl.as_secs().min(i64::MAX as u64) as i64)
        };

        self.conn
            .execute(&self.sql.set, params![key, value.to_vec(), expiry])
            .await
            .map_err(StorageError::Query)?;

        Ok(())
    }

    /// Deletes the entry under `key`.
    ///
    /// An empty key is a no-op; deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Ok(());
        }

        self.conn
            .execute(&self.sql.delete, params![key])
            .await
            .map_err(StorageError::Query)?;

        Ok(())
    }

    /// Deletes every entry. The schema stays in place and the store remains
    /// usable.
    pub async fn reset(&self) -> Result<(), StorageError> {
        self.conn
            .execute(&self.sql.reset, ())
            .await
            .map_err(StorageError::Query)?;

        Ok(())
    }

    /// Stops the garbage collector, waits for it to exit, then releases the
    /// connection.
    ///
    /// Consuming `self` makes double-close and use-after-close compile
    /// errors rather than runtime surprises.
    pub async fn close(mut self) -> Result<(), StorageError> {
        if let Some(gc) = self.gc.take() {
            gc.shutdown().await;
        }
        info!("storage closed");
        // db and conn drop here, releasing the connection exactly once.
        Ok(())
    }

    /// The raw connection, for queries this API does not cover.
    ///
    /// Ownership stays with the store; the connection is released by
    /// [`Storage::close`].
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// The underlying database handle. Useful for `sync()` on embedded
    /// replicas.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// A snapshot of garbage-collector activity, including sweep failures,
    /// which never surface through the other methods.
    pub fn gc_stats(&self) -> GcStats {
        self.gc_counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Connection as ConnectionConfig;
    use crate::config::DEFAULT_TABLE;

    async fn open_memory() -> Storage {
        open_memory_with_gc(Duration::from_secs(10)).await
    }

    async fn open_memory_with_gc(gc_interval: Duration) -> Storage {
        Storage::new(Config {
            connection: ConnectionConfig::Local {
                path: ":memory:".to_string(),
            },
            gc_interval,
            ..Config::default()
        })
        .await
        .unwrap()
    }

    async fn count_rows(storage: &Storage) -> i64 {
        let mut rows = storage
            .conn()
            .query(&format!("SELECT COUNT(*) FROM {DEFAULT_TABLE}"), ())
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
    }

    #[tokio::test]
    async fn empty_key_operations_are_noops() {
        let storage = open_memory().await;

        assert_eq!(storage.get("").await.unwrap(), None);
        storage.set("", Bytes::from("value"), Duration::ZERO).await.unwrap();
        storage.delete("").await.unwrap();
        assert_eq!(count_rows(&storage).await, 0);
    }

    #[tokio::test]
    async fn empty_value_is_not_stored() {
        let storage = open_memory().await;

        storage.set("key", Bytes::new(), Duration::ZERO).await.unwrap();
        assert_eq!(count_rows(&storage).await, 0);
    }

    #[tokio::test]
    async fn set_then_get_without_ttl() {
        let storage = open_memory().await;

        storage
            .set("name", Bytes::from("value"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(storage.get("name").await.unwrap(), Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn get_absent_key_is_none_not_error() {
        let storage = open_memory().await;
        assert_eq!(storage.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let storage = open_memory().await;

        storage
            .set("temp", Bytes::from("temporary"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            storage.get("temp").await.unwrap(),
            Some(Bytes::from("temporary"))
        );

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(storage.get("temp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_hidden_not_deleted_by_get() {
        let storage = open_memory().await;

        storage
            .set("temp", Bytes::from("v"), Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(storage.get("temp").await.unwrap(), None);
        // The row is still physically there; removal is the collector's job.
        assert_eq!(count_rows(&storage).await, 1);
    }

    #[tokio::test]
    async fn set_overwrites_value_and_expiry() {
        let storage = open_memory().await;

        storage
            .set("key", Bytes::from("first"), Duration::from_secs(1))
            .await
            .unwrap();
        storage
            .set("key", Bytes::from("second"), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(storage.get("key").await.unwrap(), Some(Bytes::from("second")));
        assert_eq!(count_rows(&storage).await, 1);

        // The rewritten entry no longer carries the one-second ttl.
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(storage.get("key").await.unwrap(), Some(Bytes::from("second")));
    }

    #[tokio::test]
    async fn delete_absent_key_is_ok() {
        let storage = open_memory().await;
        storage.delete("missing").await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let storage = open_memory().await;

        storage.set("key", Bytes::from("v"), Duration::ZERO).await.unwrap();
        storage.delete("key").await.unwrap();
        assert_eq!(storage.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reset_clears_all_keys_but_keeps_schema_usable() {
        let storage = open_memory().await;

        storage.set("a", Bytes::from("1"), Duration::ZERO).await.unwrap();
        storage.set("b", Bytes::from("2"), Duration::ZERO).await.unwrap();
        storage.reset().await.unwrap();

        assert_eq!(storage.get("a").await.unwrap(), None);
        assert_eq!(storage.get("b").await.unwrap(), None);

        storage.set("c", Bytes::from("3"), Duration::ZERO).await.unwrap();
        assert_eq!(storage.get("c").await.unwrap(), Some(Bytes::from("3")));
    }

    #[tokio::test]
    async fn session_scenario() {
        let storage = open_memory().await;

        storage
            .set("john", Bytes::from("doe"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(storage.get("john").await.unwrap(), Some(Bytes::from("doe")));

        storage
            .set("temp", Bytes::from("temporary"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            storage.get("temp").await.unwrap(),
            Some(Bytes::from("temporary"))
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(storage.get("temp").await.unwrap(), None);

        storage.delete("john").await.unwrap();
        assert_eq!(storage.get("john").await.unwrap(), None);
    }

    #[tokio::test]
    async fn gc_removes_expired_rows_without_reads() {
        let storage = open_memory_with_gc(Duration::from_millis(100)).await;

        storage
            .set("temp", Bytes::from("v"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(count_rows(&storage).await, 1);

        // Past the ttl plus a few sweep intervals, with no get issued.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count_rows(&storage).await, 0);

        let stats = storage.gc_stats();
        assert!(stats.sweeps >= 1);
        assert_eq!(stats.reclaimed, 1);
    }

    #[tokio::test]
    async fn close_stops_the_collector() {
        let storage = open_memory_with_gc(Duration::from_millis(50)).await;
        let conn = storage.conn().clone();
        let queries = Queries::for_table(DEFAULT_TABLE);

        storage.close().await.unwrap();

        conn.execute(&queries.set, params!["old", b"v".to_vec(), now_unix() - 10])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {DEFAULT_TABLE}"), ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1, "no sweep should run after close");
    }

    #[tokio::test]
    async fn dropped_store_stops_the_collector() {
        let storage = open_memory_with_gc(Duration::from_millis(20)).await;
        let conn = storage.conn().clone();
        let queries = Queries::for_table(DEFAULT_TABLE);

        drop(storage);

        // Give the collector time to observe the drop signal, then hand it
        // an expired row it would sweep if it were still running.
        tokio::time::sleep(Duration::from_millis(100)).await;
        conn.execute(&queries.set, params!["old", b"v".to_vec(), now_unix() - 10])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {DEFAULT_TABLE}"), ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1, "no sweep should run after the store is dropped");
    }

    #[tokio::test]
    async fn huge_ttl_never_hides_the_entry() {
        let storage = open_memory().await;

        storage
            .set("forever", Bytes::from("v"), Duration::MAX)
            .await
            .unwrap();
        assert_eq!(
            storage.get("forever").await.unwrap(),
            Some(Bytes::from("v"))
        );
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db").to_string_lossy().into_owned();
        let config = Config {
            connection: ConnectionConfig::Local { path },
            ..Config::default()
        };

        let storage = Storage::new(config.clone()).await.unwrap();
        storage
            .set("persisted", Bytes::from("value"), Duration::ZERO)
            .await
            .unwrap();
        storage.close().await.unwrap();

        let storage = Storage::new(config).await.unwrap();
        assert_eq!(
            storage.get("persisted").await.unwrap(),
            Some(Bytes::from("value"))
        );
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_flag_drops_existing_data_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db").to_string_lossy().into_owned();
        let config = Config {
            connection: ConnectionConfig::Local { path },
            ..Config::default()
        };

        let storage = Storage::new(config.clone()).await.unwrap();
        storage.set("key", Bytes::from("v"), Duration::ZERO).await.unwrap();
        storage.close().await.unwrap();

        let storage = Storage::new(Config {
            reset: true,
            ..config
        })
        .await
        .unwrap();
        assert_eq!(storage.get("key").await.unwrap(), None);
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_fails_construction() {
        let result = Storage::new(Config {
            connection: ConnectionConfig::Local {
                path: String::new(),
            },
            ..Config::default()
        })
        .await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
