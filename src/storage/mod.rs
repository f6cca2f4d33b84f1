//! Storage Module
//!
//! The core of the crate: an expiring key-value table on a libSQL database
//! plus the background task that reclaims expired rows.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       Storage                          │
//! │   get / set / delete / reset      (single statements)  │
//! │                        │                               │
//! │                        ▼                               │
//! │              libsql::Connection ◄──────┐               │
//! │                        ▲               │               │
//! │                        │               │               │
//! │            ┌───────────┴─────────┐     │               │
//! │            │   Schema Manager    │     │               │
//! │            │ (runs once at open) │     │               │
//! │            └─────────────────────┘     │               │
//! │                      ┌─────────────────┴────────┐      │
//! │                      │   Garbage Collector      │      │
//! │                      │  (background Tokio task) │      │
//! │                      └──────────────────────────┘      │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiration happens twice over, on purpose:
//!
//! - **Lazy**: `get` hides rows whose expiry has passed, without deleting
//!   them. The read path stays a single side-effect-free statement.
//! - **Active**: the garbage collector periodically bulk-deletes expired
//!   rows, so keys that are never read again still get reclaimed.
//!
//! Between sweeps the physical row count can exceed the number of visible
//! keys; that window is bounded by the configured GC interval.

mod gc;
pub(crate) mod schema;
pub mod store;

pub use gc::GcStats;
pub use store::Storage;
