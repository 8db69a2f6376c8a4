//! Async gate
//!
//! A two-state latch (open / closed) that parks callers while one task does
//! exclusive work. Closing the gate hands out a [`GateGuard`]; reopening it
//! through [`GateGuard::disable`] wakes every parked [`GateWaiter`] with the
//! same outcome. A guard that is dropped without `disable` (early return,
//! panic unwind, cancelled future) reopens the gate and releases waiters with
//! [`PopulationError::Abandoned`], so the gate cannot wedge.

use crate::error::{PopulationError, PopulationResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome broadcast to waiters when the gate reopens
pub type GateOutcome = PopulationResult<()>;

type OutcomeSender = watch::Sender<Option<GateOutcome>>;

enum GateState {
    Open,
    Closed(OutcomeSender),
}

/// Open/closed latch shared between the populating task and its waiters
#[derive(Clone)]
pub struct AsyncGate {
    state: Arc<Mutex<GateState>>,
}

impl AsyncGate {
    /// Create an open gate
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::Open)),
        }
    }

    /// Close the gate
    ///
    /// Returns `None` when the gate is already closed; exactly one caller
    /// owns the guard at a time.
    #[must_use]
    pub fn enable(&self) -> Option<GateGuard> {
        let mut state = self.state.lock();
        if matches!(*state, GateState::Closed(_)) {
            return None;
        }
        let (tx, _) = watch::channel(None);
        let rx = tx.subscribe();
        *state = GateState::Closed(tx);
        drop(state);

        tracing::trace!("gate closed");
        Some(GateGuard {
            state: Arc::clone(&self.state),
            template: rx,
            reopened: false,
        })
    }

    /// Waitable for the current closed period, `None` when open
    #[must_use]
    pub fn waiter(&self) -> Option<GateWaiter> {
        match &*self.state.lock() {
            GateState::Open => None,
            GateState::Closed(tx) => Some(GateWaiter { rx: tx.subscribe() }),
        }
    }

    /// Whether the gate is closed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), GateState::Closed(_))
    }

    /// Number of outstanding waiters for the current closed period
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        match &*self.state.lock() {
            GateState::Open => 0,
            // The guard keeps one receiver for minting waiters.
            GateState::Closed(tx) => tx.receiver_count().saturating_sub(1),
        }
    }
}

impl Default for AsyncGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncGate")
            .field("closed", &self.is_closed())
            .field("waiters", &self.waiter_count())
            .finish()
    }
}

/// Exclusive handle on a closed gate
///
/// Reopens the gate exactly once: through [`GateGuard::disable`] or on drop.
#[must_use = "dropping the guard reopens the gate immediately"]
pub struct GateGuard {
    state: Arc<Mutex<GateState>>,
    template: watch::Receiver<Option<GateOutcome>>,
    reopened: bool,
}

impl GateGuard {
    /// Waitable released when this guard reopens the gate
    #[must_use]
    pub fn waiter(&self) -> GateWaiter {
        GateWaiter {
            rx: self.template.clone(),
        }
    }

    /// Reopen the gate and release all waiters with `outcome`
    pub fn disable(mut self, outcome: GateOutcome) {
        self.reopen(outcome);
    }

    fn reopen(&mut self, outcome: GateOutcome) {
        if self.reopened {
            return;
        }
        self.reopened = true;

        let previous = std::mem::replace(&mut *self.state.lock(), GateState::Open);
        if let GateState::Closed(tx) = previous {
            tracing::trace!(ok = outcome.is_ok(), "gate reopened");
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        if !self.reopened {
            tracing::debug!("gate guard dropped without outcome, releasing waiters");
            self.reopen(Err(PopulationError::Abandoned));
        }
    }
}

impl std::fmt::Debug for GateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateGuard")
            .field("reopened", &self.reopened)
            .finish_non_exhaustive()
    }
}

/// Parked caller of a closed gate
#[derive(Debug)]
pub struct GateWaiter {
    rx: watch::Receiver<Option<GateOutcome>>,
}

impl GateWaiter {
    /// Wait until the gate reopens and return its outcome
    pub async fn wait(mut self) -> GateOutcome {
        loop {
            if let Some(outcome) = self.rx.borrow_and_update().clone() {
                return outcome;
            }
            if self.rx.changed().await.is_err() {
                // Sender gone: the value it left behind, if any, is final.
                return self
                    .rx
                    .borrow()
                    .clone()
                    .unwrap_or(Err(PopulationError::Abandoned));
            }
        }
    }
}
