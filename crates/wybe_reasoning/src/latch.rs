//! Single in-flight latch.
//!
//! `try_acquire` hands out at most one guard at a time. Dropping the guard
//! releases the latch, so every exit path of the task holding it (success,
//! failure, panic) frees it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        if self.busy.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(InFlightGuard {
                busy: Arc::clone(&self.busy),
            })
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
