// crates/rewrite/src/stats.rs

//! Engine-level counters. All shared atomics; cheap enough to bump on
//! every request path.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RewriteStats {
    pub rewrites_started: AtomicU64,
    pub rewrites_completed: AtomicU64,
    pub passthroughs: AtomicU64,
    pub metadata_hits: AtomicU64,
    pub metadata_misses: AtomicU64,
    pub deadline_expiries: AtomicU64,
    pub work_bound_rejections: AtomicU64,
    pub cache_unhealthy: AtomicU64,
    pub invariant_violations: AtomicU64,
}

impl RewriteStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
