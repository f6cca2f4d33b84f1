//! Storage Configuration
//!
//! This module defines the configuration surface of the store: which database
//! to open (a local file, a remote Turso database, or an embedded replica
//! that syncs against a remote primary), which table to use, whether to drop
//! that table on startup, and how often the garbage collector sweeps.
//!
//! Defaults are produced by a plain [`Default`] impl; there is no shared
//! mutable global. Missing fields fall back field-by-field when the store is
//! constructed:
//!
//! - an empty table name falls back to [`DEFAULT_TABLE`]
//! - a zero GC interval falls back to [`DEFAULT_GC_INTERVAL`]
//!
//! Each [`Connection`] variant is validated independently before anything is
//! opened, so a misconfigured store fails fast with a [`ConfigError`] instead
//! of a confusing driver error later.
//!
//! ## Example
//!
//! ```no_run
//! use libsql_store::{Config, Connection};
//! use std::time::Duration;
//!
//! let config = Config {
//!     connection: Connection::Remote {
//!         url: "libsql://my-db.turso.io".to_string(),
//!         auth_token: std::env::var("TURSO_AUTH_TOKEN").unwrap(),
//!     },
//!     table: "sessions".to_string(),
//!     reset: false,
//!     gc_interval: Duration::from_secs(30),
//! };
//! ```

use std::time::Duration;

use bytes::Bytes;
use libsql::{Builder, Cipher, Database, EncryptionConfig};
use thiserror::Error;

/// Database opened when no connection is configured explicitly.
pub const DEFAULT_DATABASE: &str = "./storage.db";

/// Table used when the configured table name is empty.
pub const DEFAULT_TABLE: &str = "kv_storage";

/// Sweep period used when the configured GC interval is zero.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

/// Errors produced by configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A local connection was configured without a database path.
    #[error("local connection requires a database path")]
    MissingDatabase,

    /// A remote connection was configured without a URL or auth token.
    #[error("remote connection requires both a database URL and an auth token")]
    MissingRemoteParams,

    /// An embedded replica was configured without a path, primary URL or
    /// auth token.
    #[error("embedded replica requires a database path, a primary URL and an auth token")]
    MissingReplicaParams,
}

/// Selects and parameterizes the underlying database connection.
///
/// All three variants share one capability: opening a [`libsql::Database`].
/// The store does not care which one it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// A local database file (or `:memory:`).
    Local {
        /// Path to the database file.
        path: String,
    },

    /// A remote Turso database reached over HTTP.
    Remote {
        /// Database URL, e.g. `libsql://my-db.turso.io`.
        url: String,
        /// Auth token for the database.
        auth_token: String,
    },

    /// A local replica that syncs against a remote primary.
    ///
    /// Reads are served from the local file; writes are forwarded to the
    /// primary.
    EmbeddedReplica {
        /// Path to the local replica file.
        path: String,
        /// URL of the remote primary.
        primary_url: String,
        /// Auth token for the primary.
        auth_token: String,
        /// Encrypts the local replica file when set.
        encryption_key: Option<String>,
        /// How often the replica syncs with the primary. `None` disables
        /// periodic sync; call `Database::sync` manually instead.
        sync_interval: Option<Duration>,
    },
}

impl Connection {
    /// Checks that the variant carries every parameter it needs.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Connection::Local { path } => {
                if path.is_empty() {
                    return Err(ConfigError::MissingDatabase);
                }
            }
            Connection::Remote { url, auth_token } => {
                if url.is_empty() || auth_token.is_empty() {
                    return Err(ConfigError::MissingRemoteParams);
                }
            }
            Connection::EmbeddedReplica {
                path,
                primary_url,
                auth_token,
                ..
            } => {
                if path.is_empty() || primary_url.is_empty() || auth_token.is_empty() {
                    return Err(ConfigError::MissingReplicaParams);
                }
            }
        }
        Ok(())
    }

    /// Opens the database described by this variant.
    pub(crate) async fn open(&self) -> Result<Database, libsql::Error> {
        match self {
            Connection::Local { path } => Builder::new_local(path).build().await,
            Connection::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
            }
            Connection::EmbeddedReplica {
                path,
                primary_url,
                auth_token,
                encryption_key,
                sync_interval,
            } => {
                let mut builder =
                    Builder::new_remote_replica(path, primary_url.clone(), auth_token.clone());
                if let Some(interval) = sync_interval {
                    builder = builder.sync_interval(*interval);
                }
                if let Some(key) = encryption_key {
                    builder = builder.encryption_config(EncryptionConfig::new(
                        Cipher::Aes256Cbc,
                        Bytes::from(key.clone()),
                    ));
                }
                builder.build().await
            }
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Connection::Local {
            path: DEFAULT_DATABASE.to_string(),
        }
    }
}

/// Configuration for a [`Storage`](crate::Storage) instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Which database to open.
    pub connection: Connection,

    /// Name of the table holding the key-value rows.
    ///
    /// The name is interpolated verbatim into DDL and DML statements, not
    /// bound as a parameter. The caller is trusted to supply a safe SQL
    /// identifier.
    pub table: String,

    /// Drop and recreate the table at construction time.
    pub reset: bool,

    /// Period between garbage-collection sweeps.
    pub gc_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: Connection::default(),
            table: DEFAULT_TABLE.to_string(),
            reset: false,
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }
}

impl Config {
    /// Validates the connection and applies field-by-field fallbacks.
    pub(crate) fn normalized(mut self) -> Result<Self, ConfigError> {
        self.connection.validate()?;
        if self.table.is_empty() {
            self.table = DEFAULT_TABLE.to_string();
        }
        if self.gc_interval.is_zero() {
            self.gc_interval = DEFAULT_GC_INTERVAL;
        }
        Ok(self)
    }
}
