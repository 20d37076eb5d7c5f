//! `mailgrab`: download every attachment from a mailbox label.
//!
//! This crate provides the core library: MIME walking, content-hash
//! de-duplication, collision-safe naming, no-clobber storage, and the
//! mailbox abstraction the command-line tool drives.

pub mod config;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod mailbox;
pub mod model;
pub mod parser;
pub mod store;
