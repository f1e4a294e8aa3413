//! Record storage.
//!
//! This module provides the storage side of the coordination layer, including:
//!
//! - The [`RecordStore`] trait the controller consumes
//! - [`ListCursor`], the live client-side view of one folder
//! - An in-memory store for demos and tests
//! - A SQLite store with async-safe access via tokio::task::spawn_blocking

mod cursor;
mod database;
mod memory;
pub mod queries;
mod schema;
mod sqlite;
mod traits;

pub use cursor::{ListCursor, LoadOutcome};
pub use database::{Database, DatabaseError, Result};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    Disposition, RecordStore, RecordUpdate, StoreError, StoreNotification, StoreResult,
    UpdateBatch, UpdateOp, ViewSpec,
};
