//! Typed event channels for cross-component communication.
//!
//! Each event category (account, folder, selection, list, toast) has its own
//! publish-subscribe channel. Delivery is synchronous and follows subscription
//! order, on whichever thread publishes; the controller only publishes from the
//! coordination thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{Account, Folder, RecordId};
use crate::services::{SyncErrorNotice, ToastOperation};

/// Account-level notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    /// A different account became active.
    Changed(Account),
    /// The active account kept its identity but its settings changed.
    SettingsChanged(Account),
}

/// Folder-level notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum FolderEvent {
    /// A different folder was opened.
    Changed(Folder),
    /// The open folder kept its identity but its flags or status changed.
    Updated(Folder),
    /// The hierarchy breadcrumb moved.
    HierarchyChanged(Option<Folder>),
}

/// Selection set notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// The set went from empty to non-empty.
    Populated { count: usize },
    /// The set changed and is still non-empty.
    Changed { count: usize },
    /// The set became empty.
    Emptied,
}

/// List notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// A new record set was swapped in.
    DataSetChanged { count: usize },
    /// The list was dropped without a replacement.
    Invalidated,
    /// The last committed batch was reversed.
    UndoApplied,
    /// The record shown in the reading pane changed.
    CurrentRecordChanged(Option<RecordId>),
}

/// Status strip notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastEvent {
    /// An undo descriptor became available.
    Undo(ToastOperation),
    /// A sync error should be shown with its recovery action.
    Error(SyncErrorNotice),
    /// The visible toast went away.
    Dismissed,
}

/// Subscriber ID for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Event handler function type.
pub type EventHandler<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Publish-subscribe channel for one event category.
///
/// Clones share the same subscriber list.
pub struct EventChannel<E> {
    handlers: Arc<Mutex<BTreeMap<u64, EventHandler<E>>>>,
    next_id: Arc<AtomicU64>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers an observer. Returns an ID that can be used to unsubscribe.
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, Box::new(handler));
        SubscriberId(id)
    }

    /// Removes an observer. Returns false when it was not registered.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) -> bool {
        self.lock().remove(&subscriber_id.0).is_some()
    }

    /// Delivers `event` to every observer in subscription order.
    ///
    /// Handlers must not subscribe or unsubscribe on the same channel.
    pub fn publish(&self, event: &E) {
        for handler in self.lock().values() {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, EventHandler<E>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Clone for EventChannel<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<E> std::fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The channels the controller exposes to the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct ControllerEvents {
    pub account: EventChannel<AccountEvent>,
    pub folder: EventChannel<FolderEvent>,
    pub selection: EventChannel<SelectionEvent>,
    pub list: EventChannel<ListEvent>,
    pub toast: EventChannel<ToastEvent>,
}

impl ControllerEvents {
    pub fn new() -> Self {
        Self::default()
    }
}
