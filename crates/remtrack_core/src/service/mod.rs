//! Core use-case services.
//!
//! # Responsibility
//! - Own the in-memory database and its read/modify/write cycle.
//! - Keep controller/CLI layers decoupled from storage details.

pub mod accuracy_store;
