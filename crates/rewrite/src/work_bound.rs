// crates/rewrite/src/work_bound.rs

//! Admission control for expensive rewrites.
//!
//! Increment-then-test: the slot is claimed before the bound is checked
//! and rolled back on rejection. Under a race at the exact ceiling this
//! can reject two callers where one would have fit; under-admission is
//! the intended bias.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct WorkBound {
    bound: usize,
    in_flight: AtomicUsize,
}

impl WorkBound {
    pub fn new(bound: usize) -> Self {
        WorkBound {
            bound,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Claim a slot; returns false (and leaves the count unchanged) when
    /// the bound is reached.
    pub fn try_to_work(&self) -> bool {
        let prior = self.in_flight.fetch_add(1, Ordering::AcqRel);
        if prior >= self.bound {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            false
        } else {
            true
        }
    }

    /// Release a slot claimed by a successful `try_to_work`.
    pub fn work_complete(&self) {
        let prior = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prior > 0, "work_complete without matching try_to_work");
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Guard form: releases the slot on drop.
pub struct WorkPermit<'a> {
    bound: &'a WorkBound,
}

impl WorkBound {
    pub fn try_acquire(&self) -> Option<WorkPermit<'_>> {
        self.try_to_work().then_some(WorkPermit { bound: self })
    }
}

impl Drop for WorkPermit<'_> {
    fn drop(&mut self) {
        self.bound.work_complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn saturation_sequence() {
        // Two independent users sharing one counter, bound = 2.
        let shared = Arc::new(WorkBound::new(2));
        let (a, b) = (Arc::clone(&shared), Arc::clone(&shared));

        assert!(a.try_to_work());
        assert!(b.try_to_work());
        assert!(!a.try_to_work()); // at ceiling
        b.work_complete();
        assert!(a.try_to_work()); // back under the bound
        assert_eq!(shared.in_flight(), 2);
    }

    #[test]
    fn permit_releases_on_drop() {
        let bound = WorkBound::new(1);
        {
            let _permit = bound.try_acquire().unwrap();
            assert!(bound.try_acquire().is_none());
        }
        assert!(bound.try_acquire().is_some());
    }
}
