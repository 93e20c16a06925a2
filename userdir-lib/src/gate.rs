//! Yes/no gate in front of destructive actions.

use std::future::Future;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState<K> {
    Idle,
    PendingConfirmation(K),
}

/// Holds at most one pending destructive target.
///
/// The gate never looks at what the action returns and never retries it.
#[derive(Debug, Clone)]
pub struct ConfirmationGate<K> {
    state: GateState<K>,
}

impl<K> Default for ConfirmationGate<K> {
    fn default() -> Self {
        Self {
            state: GateState::Idle,
        }
    }
}

impl<K: Copy + std::fmt::Debug> ConfirmationGate<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState<K> {
        self.state
    }

    pub fn pending(&self) -> Option<K> {
        match self.state {
            GateState::PendingConfirmation(k) => Some(k),
            GateState::Idle => None,
        }
    }

    /// Arms the gate for `target`, returning a target it replaced.
    pub fn request(&mut self, target: K) -> Option<K> {
        let previous = self.pending();
        debug!(?target, ?previous, "confirmation requested");
        self.state = GateState::PendingConfirmation(target);
        previous
    }

    /// Back to idle without side effects.
    pub fn cancel(&mut self) -> Option<K> {
        let previous = self.pending();
        self.state = GateState::Idle;
        previous
    }

    /// Back to idle, handing out the target to act on.
    pub fn confirm(&mut self) -> Option<K> {
        self.cancel()
    }

    /// Runs `action` on the pending target. The gate is idle again before the
    /// action starts, whatever the action ends up returning.
    pub async fn confirm_with<F, Fut, T>(&mut self, action: F) -> Option<T>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = T>,
    {
        let target = self.confirm()?;
        debug!(?target, "confirmed");
        Some(action(target).await)
    }
}
