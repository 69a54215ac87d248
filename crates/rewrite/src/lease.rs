// crates/rewrite/src/lease.rs

//! Single-flight lease table.
//!
//! At most one task holds the lease for a given metadata key; everyone
//! else attaches as a waiter and is woken when the holder releases. The
//! lease is a guard, so a panicking or cancelled holder still releases.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

type LeaseMap = Arc<Mutex<HashMap<String, watch::Receiver<()>>>>;

#[derive(Default)]
pub struct LeaseTable {
    map: LeaseMap,
}

/// Held by the single task allowed to do the work for a key.
pub struct Lease {
    map: LeaseMap,
    key: String,
    // Dropping the sender wakes every waiter.
    _tx: watch::Sender<()>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.map.lock().remove(&self.key);
        trace!(key = %self.key, "lease released");
    }
}

/// A waiter's handle; resolves when the holder releases.
pub struct Waiter {
    rx: watch::Receiver<()>,
}

impl Waiter {
    /// Wait for the current holder to release. Returns immediately if it
    /// already has.
    pub async fn released(mut self) {
        // Err means the sender is gone, which is exactly the release.
        let _ = self.rx.changed().await;
    }
}

pub enum LeaseOutcome {
    Acquired(Lease),
    Busy(Waiter),
}

impl LeaseTable {
    pub fn new() -> Self {
        LeaseTable::default()
    }

    /// Non-blocking: either take the lease or attach as a waiter.
    pub fn try_acquire(&self, key: &str) -> LeaseOutcome {
        let mut map = self.map.lock();
        if let Some(rx) = map.get(key) {
            return LeaseOutcome::Busy(Waiter { rx: rx.clone() });
        }
        let (tx, rx) = watch::channel(());
        map.insert(key.to_string(), rx);
        trace!(key, "lease acquired");
        LeaseOutcome::Acquired(Lease {
            map: Arc::clone(&self.map),
            key: key.to_string(),
            _tx: tx,
        })
    }
}
