//! Source readiness gate
//!
//! A small state machine (`Created → Initializing → Initialized | Error`) with a
//! queue of deferred callbacks. Consumers that ask for data before the catalog
//! has loaded are queued and notified exactly once, in registration order, when
//! the source reaches a terminal state.
//!
//! The state transition and the drain of the queue happen under one lock, so a
//! callback can never be registered "between" them and get lost. The lock is
//! re-entrant: a callback may itself call [`ReadinessGate::when_ready`].

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::fmt;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Callback invoked with `true` when the source initialized, `false` on error.
pub type ReadyCallback = Box<dyn FnOnce(bool) + Send>;

/// Load state of a music source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    Created,
    Initializing,
    Initialized,
    Error,
}

impl SourceState {
    /// Whether this state ends a load cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SourceState::Initialized | SourceState::Error)
    }
}

struct GateInner {
    state: SourceState,
    pending: Vec<ReadyCallback>,
}

/// Deferred-callback gate guarding catalog availability.
pub struct ReadinessGate {
    inner: ReentrantMutex<RefCell<GateInner>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(GateInner {
                state: SourceState::Created,
                pending: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> SourceState {
        self.inner.lock().borrow().state
    }

    /// Number of callbacks waiting for the current load cycle.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().borrow().pending.len()
    }

    /// Move to `state`.
    ///
    /// Entering `Initialized` or `Error` delivers every queued callback once, in
    /// FIFO order, and clears the queue.
    pub fn set_state(&self, state: SourceState) {
        let guard = self.inner.lock();

        let drained = {
            let mut inner = guard.borrow_mut();
            if inner.state == state && !state.is_terminal() {
                return;
            }
            debug!(from = ?inner.state, to = ?state, "Source state changed");
            inner.state = state;

            if state.is_terminal() {
                std::mem::take(&mut inner.pending)
            } else {
                Vec::new()
            }
        };

        let success = state == SourceState::Initialized;
        for callback in drained {
            callback(success);
        }
    }

    /// Run `callback` once the source is ready.
    ///
    /// Returns `true` if the callback ran immediately, `false` if it was queued.
    pub fn when_ready(&self, callback: ReadyCallback) -> bool {
        let guard = self.inner.lock();

        let state = guard.borrow().state;
        match state {
            SourceState::Created | SourceState::Initializing => {
                trace!("Queued readiness callback");
                guard.borrow_mut().pending.push(callback);
                false
            }
            SourceState::Initialized | SourceState::Error => {
                callback(state == SourceState::Initialized);
                true
            }
        }
    }

    /// Wait for the source to become ready.
    ///
    /// Resolves to `false` on error, or if the pending queue is discarded
    /// before the load completes.
    pub async fn ready(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        self.when_ready(Box::new(move |success| {
            let _ = tx.send(success);
        }));
        rx.await.unwrap_or(false)
    }

    /// Drop every queued callback without invoking it.
    pub fn clear_pending(&self) {
        let guard = self.inner.lock();
        let dropped = std::mem::take(&mut guard.borrow_mut().pending);
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "Discarded pending readiness callbacks");
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f.debug_struct("ReadinessGate")
            .field("state", &inner.state)
            .field("pending", &inner.pending.len())
            .finish()
    }
}
