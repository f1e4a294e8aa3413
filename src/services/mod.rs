//! Coordination services layer.
//!
//! This module contains the pieces that keep a mailbox session consistent
//! while mutations, refreshes and undo race each other.
//!
//! # Architecture
//!
//! Services sit between the presentation layer and the store:
//!
//! ```text
//! Presentation Layer (Presenter, Events)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//!  Storage (RecordStore, ListCursor)
//! ```
//!
//! # Services Overview
//!
//! - [`MailboxController`]: Owns the session and serializes every operation
//! - [`SelectionSet`]: The user's multi-record selection
//! - [`PendingDestruction`]: The one destructive action awaiting its animation
//! - [`RefreshCoordinator`]: Holds list swaps off during animations and drags
//! - [`AutoAdvanceResolver`]: Picks the next record when the current one goes away

mod actions;
mod auto_advance;
mod controller;
mod pending;
mod propagator;
mod refresh;
mod selection;
mod snapshot;
mod toast;
mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use actions::{
    ActionContext, ActionOutcome, DestructiveAction, FolderChange, MutationKind, UndoScheduler,
};
pub use auto_advance::{AutoAdvanceOutcome, AutoAdvanceResolver, ContinuationToken};
pub use controller::{
    ControllerError, ControllerMessage, ControllerResult, MailboxController, MutationOutcome,
};
pub use pending::PendingDestruction;
pub use propagator::{AccountTransition, ChangePropagator, FolderTransition};
pub use refresh::{RefreshCoordinator, RefreshLatches, RefreshPlan};
pub use selection::SelectionSet;
pub use snapshot::SavedState;
pub use toast::{RecoveryAction, SyncErrorNotice, Toast, ToastOperation};
pub use tracker::PositionTracker;
