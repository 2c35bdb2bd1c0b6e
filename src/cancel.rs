//! Process-wide cooperative cancellation.
//!
//! One signal is shared by the foreground and whichever operation is in
//! flight. Each operation starts by calling [`CancellationSignal::reset`],
//! which installs a fresh token, so a cancel aimed at an earlier run never
//! reaches the next one. Workers only poll the token at line boundaries.

use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the signal for a new operation and hand the worker its token.
    pub fn reset(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        *self.lock() = fresh.clone();
        fresh
    }

    /// Request that the operation in flight stops at its next line boundary.
    pub fn cancel(&self) {
        let token = self.lock().clone();
        tracing::debug!("cancellation requested");
        token.cancel();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
