use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::DubError;

/// Cooperative shutdown signal shared by all runs
///
/// Runs poll it between units, so a triggered shutdown stops work at the next
/// cache boundary.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once shutdown was requested
    pub fn check(&self) -> Result<(), DubError> {
        if self.is_triggered() {
            return Err(DubError::Cancelled);
        }
        Ok(())
    }
}
