//! Pending-action register.
//!
//! Holds the single destructive action that is waiting for its removal
//! animation. Replacing it always performs the previous one first, so at most
//! one action is ever in flight.

use std::sync::Arc;

use super::actions::{ActionContext, ActionOutcome, DestructiveAction};

/// Slot for the action awaiting commit.
#[derive(Debug, Default)]
pub enum PendingDestruction {
    #[default]
    Empty,
    Pending(Arc<DestructiveAction>),
}

impl PendingDestruction {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn action(&self) -> Option<&Arc<DestructiveAction>> {
        match self {
            Self::Empty => None,
            Self::Pending(action) => Some(action),
        }
    }

    /// True when `action` is the one held.
    pub fn holds(&self, action: &Arc<DestructiveAction>) -> bool {
        self.action().is_some_and(|held| Arc::ptr_eq(held, action))
    }

    /// Performs whatever is pending, then holds `next`.
    ///
    /// Re-registering the action already held does not perform it. Returns the
    /// outcome of the flushed predecessor, if there was one.
    pub fn flush_and_replace(
        &mut self,
        next: Arc<DestructiveAction>,
        ctx: &mut ActionContext<'_>,
    ) -> Option<ActionOutcome> {
        if self.holds(&next) {
            return None;
        }

        let flushed = self.flush(ctx);
        *self = Self::Pending(next);
        flushed
    }

    /// Performs and releases the pending action.
    pub fn flush(&mut self, ctx: &mut ActionContext<'_>) -> Option<ActionOutcome> {
        match std::mem::take(self) {
            Self::Empty => None,
            Self::Pending(action) => {
                tracing::debug!(kind = ?action.kind(), "flushing pending action");
                Some(action.perform(ctx))
            }
        }
    }

    /// Releases the pending action without performing it.
    pub fn take(&mut self) -> Option<Arc<DestructiveAction>> {
        match std::mem::take(self) {
            Self::Empty => None,
            Self::Pending(action) => Some(action),
        }
    }
}
