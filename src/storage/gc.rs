//! Background Garbage Collection
//!
//! Reads never delete anything: an expired row is merely invisible to `get`.
//! This task is the only thing that physically removes expired rows, so that
//! keys which expire and are never read again do not grow the database
//! forever.
//!
//! ## Design
//!
//! The collector runs as a Tokio task owned by the store. On a fixed
//! interval it issues one bulk delete:
//!
//! ```sql
//! DELETE FROM <table> WHERE expiry <= ? AND expiry != 0
//! ```
//!
//! with the current Unix timestamp bound as the parameter. The interval wait
//! and the stop signal are observed in the same `select!`, so closing the
//! store is never delayed by a full tick.
//!
//! A failed sweep does not take the process down. It is logged, counted in
//! [`GcStats`], and the next tick tries again; transient database errors
//! stay isolated from foreground traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use libsql::Connection;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::store::now_unix;

/// Counters shared between the store and the collector task.
#[derive(Debug, Default)]
pub(crate) struct GcCounters {
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
    failures: AtomicU64,
}

impl GcCounters {
    pub(crate) fn snapshot(&self) -> GcStats {
        GcStats {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of garbage-collector activity.
///
/// Obtained from [`Storage::gc_stats`](crate::Storage::gc_stats). Sweep
/// failures never surface through `get`/`set`/`delete`/`reset`; this is the
/// place to monitor them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Sweeps executed since the store was opened.
    pub sweeps: u64,
    /// Expired rows physically removed by sweeps.
    pub reclaimed: u64,
    /// Sweeps that failed with a database error.
    pub failures: u64,
}

/// Handle to the running collector task.
///
/// Dropping the handle signals the task to stop; [`GcTask::shutdown`] also
/// waits for it to exit.
#[derive(Debug)]
pub(crate) struct GcTask {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl GcTask {
    /// Spawns the collector on the current Tokio runtime.
    pub(crate) fn spawn(
        conn: Connection,
        sql: String,
        interval: Duration,
        counters: Arc<GcCounters>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(gc_loop(conn, sql, interval, counters, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "garbage collector started");

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Signals the collector to stop and waits for it to exit.
    ///
    /// After this returns no further sweeps run.
    pub(crate) async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("garbage collector stopped");
    }
}

impl Drop for GcTask {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// The collector loop: sleep a tick, sweep, repeat until told to stop.
async fn gc_loop(
    conn: Connection,
    sql: String,
    interval: Duration,
    counters: Arc<GcCounters>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // Wait for the next tick or the stop signal, whichever comes first.
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("garbage collector received shutdown signal");
                    return;
                }
            }
        }

        counters.sweeps.fetch_add(1, Ordering::Relaxed);

        match conn.execute(&sql, libsql::params![now_unix()]).await {
            Ok(reclaimed) => {
                if reclaimed > 0 {
                    counters.reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
                    debug!(reclaimed, "expired rows removed");
                }
            }
            Err(e) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "gc sweep failed");
            }
        }
    }
}
