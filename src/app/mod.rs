//! Presentation-facing state and notifications.
//!
//! The controller publishes events here and calls out through [`Presenter`];
//! nothing in this module renders anything.

mod events;
mod presenter;
mod state;

pub use events::{
    AccountEvent, ControllerEvents, EventChannel, FolderEvent, ListEvent, SelectionEvent,
    SubscriberId, ToastEvent,
};
pub use presenter::{HeadlessPresenter, Presenter};
pub use state::{SessionContext, ViewMode};

#[cfg(test)]
pub(crate) use presenter::testing;
