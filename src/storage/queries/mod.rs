//! Database query modules for CRUD operations.
//!
//! Each module provides async functions that operate on the database, plus
//! connection-level helpers that compose inside a transaction.

pub mod accounts;
pub mod folders;
pub mod records;
pub mod undo;
