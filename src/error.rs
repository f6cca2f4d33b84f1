//! Error Types
//!
//! All fallible operations in this crate return [`StorageError`].
//! Construction-time failures (configuration, connection, schema) are
//! unrecoverable for that instance: `Storage::new` returns the error and no
//! store exists. Per-call failures (`Query`) are local to the call and do not
//! affect other keys or concurrent callers.
//!
//! A missing row on `get` is **not** an error; it is the normal absent result
//! and is reported as `Ok(None)`.

use thiserror::Error;

use crate::config::ConfigError;

/// The error type for all storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The supplied configuration is invalid or incomplete.
    ///
    /// Returned by `Storage::new` before any connection is attempted.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Opening or pinging the database failed.
    #[error("failed to open database: {0}")]
    Connect(#[source] libsql::Error),

    /// A DDL statement failed while creating the table or its expiry index.
    ///
    /// The store is never returned in a partially-initialized state; if this
    /// error occurs the connection has already been released.
    #[error("schema initialization failed: {0}")]
    Schema(#[source] libsql::Error),

    /// A query issued by `get`, `set`, `delete` or `reset` failed.
    #[error("query failed: {0}")]
    Query(#[source] libsql::Error),
}
