//! # libsql-store - An Expiring Key-Value Store on libSQL
//!
//! `libsql-store` is a storage backend for caching and session data, built on
//! [libSQL](https://github.com/tursodatabase/libsql). It exposes a small
//! get/set/delete/reset API with per-key TTLs and runs a background garbage
//! collector that physically removes expired rows.
//!
//! ## Features
//!
//! - **Three backends**: a local database file, a remote Turso database, or
//!   an embedded replica syncing against a remote primary
//! - **Per-key expiration**: TTLs with seconds granularity; expired keys are
//!   hidden on read and reclaimed in the background
//! - **Single-statement operations**: every call is one bounded query, with
//!   no internal locking or retries
//! - **Clean shutdown**: closing the store stops the collector, waits for it,
//!   and releases the connection exactly once
//!
//! ## Quick Start
//!
//! ```no_run
//! use libsql_store::{Config, Connection, Storage};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), libsql_store::StorageError> {
//!     let storage = Storage::new(Config {
//!         connection: Connection::Local {
//!             path: "./cache.db".to_string(),
//!         },
//!         ..Config::default()
//!     })
//!     .await?;
//!
//!     // Permanent entry
//!     storage.set("john", Bytes::from("doe"), Duration::ZERO).await?;
//!
//!     // Expires in an hour
//!     storage
//!         .set("session:1", Bytes::from("token"), Duration::from_secs(3600))
//!         .await?;
//!
//!     assert_eq!(storage.get("john").await?, Some(Bytes::from("doe")));
//!
//!     storage.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## How Expiration Works
//!
//! Each row stores a Unix timestamp next to the value; `0` means the entry
//! never expires. Expired entries are handled in two ways:
//!
//! 1. **Lazy**: `get` reports an expired row as absent without deleting it
//! 2. **Active**: a background Tokio task periodically bulk-deletes expired
//!    rows, so entries that are never read again still get reclaimed
//!
//! Sweep failures never crash the process or surface through foreground
//! calls; they are logged and exposed via [`Storage::gc_stats`].
//!
//! ## Module Overview
//!
//! - [`config`]: connection backends, defaults and validation
//! - [`storage`]: the store itself plus schema management and the collector
//! - [`error`]: the [`StorageError`] taxonomy

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, Connection};
pub use config::{DEFAULT_DATABASE, DEFAULT_GC_INTERVAL, DEFAULT_TABLE};
pub use error::StorageError;
pub use storage::{GcStats, Storage};

/// Version of libsql-store
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
