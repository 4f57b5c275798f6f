use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for a running stub.
/// These are shared between the driver task, the sandbox workers and the stub handle.
#[derive(Debug, Default)]
pub struct StubStats {
    /// Total hook calls routed to the plugin
    dispatched: AtomicUsize,
    /// Total hook calls answered without reaching the plugin
    passthrough: AtomicUsize,
    /// Total hook calls for which the plugin returned an error
    failed: AtomicUsize,
    /// Total sandbox hook calls that did not move their sandbox forward
    out_of_order: AtomicUsize,
    /// Total out-of-order sandbox hook calls rejected in strict lifecycle mode
    rejected: AtomicUsize,
    /// Number of sandboxes with a live worker
    active_sandboxes: AtomicUsize,
}

impl StubStats {
    #[inline]
    pub(crate) fn increment_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_out_of_order(&self) {
        self.out_of_order.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_active_sandboxes(&self) {
        self.active_sandboxes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn decrement_active_sandboxes(&self) {
        self.active_sandboxes.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the number of hook calls routed to the plugin.
    #[inline]
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Returns the number of hook calls answered without reaching the plugin.
    #[inline]
    pub fn passthrough(&self) -> usize {
        self.passthrough.load(Ordering::Relaxed)
    }

    /// Returns the number of hook calls the plugin failed.
    #[inline]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the number of sandbox hook calls that did not move their sandbox forward.
    #[inline]
    pub fn out_of_order(&self) -> usize {
        self.out_of_order.load(Ordering::Relaxed)
    }

    /// Returns the number of out-of-order calls rejected in strict lifecycle mode.
    #[inline]
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Returns the number of sandboxes with a live worker.
    #[inline]
    pub fn active_sandboxes(&self) -> usize {
        self.active_sandboxes.load(Ordering::Relaxed)
    }
}
