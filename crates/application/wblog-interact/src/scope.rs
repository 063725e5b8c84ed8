//! View lifetime

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "view is still mounted" flag.
///
/// In-flight requests are never cancelled on close; their results are
/// simply not written back.
#[derive(Debug, Clone)]
pub struct ViewScope {
    open: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}
