//! At most one sync run per device.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flag taken for the duration of a run. A second trigger while the flag is
/// held is absorbed instead of queued.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

/// Releases the guard when dropped, including when the run future is dropped
/// half way through.
#[derive(Debug)]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<RunPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
