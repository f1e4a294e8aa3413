//! Domain layer types for mailflow.
//!
//! This module contains the records, folders and accounts the coordination
//! layer moves around. They are owned by the backing store; the core only
//! holds transient copies.

mod account;
mod folder;
mod record;
mod types;

pub use account::{Account, AccountCapabilities, AccountSettings, AutoAdvance};
pub use folder::{
    sync_result, system_folders, Folder, FolderCapabilities, FolderOperation, FolderType,
    SyncRequest, SyncStatus,
};
pub use record::{Priority, Record, RecordSet};
pub use types::{AccountId, FolderId, RecordId};
