//! Cancellation token sources and per-operation supersession slots.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owner side of a cooperative cancellation token.
///
/// One source is created per logical operation. Cancellation is monotonic:
/// once requested it stays requested, and a cancelled source is never reused.
#[derive(Debug, Default)]
pub struct CancellationTokenSource {
    token: CancellationToken,
}

impl CancellationTokenSource {
    /// Create a new, not yet cancelled source.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token handed to the transport and any other cooperating task.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// The single "current" operation of one operation class.
///
/// Issuing a new operation cancels the previous one before the new token is
/// installed, so at most one non-cancelled operation per slot is outstanding.
#[derive(Debug)]
pub struct OperationSlot {
    name: &'static str,
    current: Mutex<CancellationTokenSource>,
}

impl OperationSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            current: Mutex::new(CancellationTokenSource::new()),
        }
    }

    /// Cancel the current operation and install a fresh source for a new one.
    ///
    /// Returns the token for the new operation.
    pub fn supersede(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if !current.is_cancellation_requested() {
            debug!(operation = self.name, "Superseding pending operation");
        }
        current.cancel();
        *current = CancellationTokenSource::new();
        current.token()
    }

    /// Cancel the current operation without starting a new one.
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Whether the current operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_cancellation_requested()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
