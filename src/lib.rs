//! mailflow - mailbox mutation, undo and refresh coordination
//!
//! This crate provides the coordination core of an email client: destructive
//! actions with deferred commit, undo, auto-advance, selection tracking and
//! refresh suppression, on top of a pluggable record store.

pub mod app;
pub mod config;
pub mod domain;
pub mod services;
pub mod storage;

pub use services::MailboxController;
