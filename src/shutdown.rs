//! Cancellation signal
//!
//! A shared [`Shutdown`] handle lets the scheduler stop dispatching new
//! fetch units on Ctrl+C while in-flight units finish their current page
//! request, so no partially written partition is left behind. The handle is
//! registered globally once so the signal handler and the scheduler don't
//! need explicit plumbing between them.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

static GLOBAL: OnceCell<Arc<Shutdown>> = OnceCell::new();

/// Register the process-wide shutdown handle. Later registrations are
/// ignored.
pub fn register_global(handle: Arc<Shutdown>) {
    let _ = GLOBAL.set(handle);
}

/// The process-wide shutdown handle, if one was registered.
pub fn global() -> Option<Arc<Shutdown>> {
    GLOBAL.get().cloned()
}

/// One-way cancellation flag with async wakeups.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create a shared handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Trigger cancellation. Waiters are woken once; repeat calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve when cancellation is triggered, immediately if it already was.
    pub async fn triggered(&self) {
        if self.is_triggered() {
            return;
        }
        self.notify.notified().await;
    }
}
