//! Domain model for rem accuracy tracking.
//!
//! # Responsibility
//! - Define the attempt/record/database shapes shared by storage, service
//!   and transfer layers.
//! - Provide the pure accuracy computation used for per-rem and overall
//!   percentages.
//!
//! # Invariants
//! - Attempt history per rem is append-only and keeps insertion order.
//! - Database keys are non-empty, trimmed rem identifiers.
//! - A reset removes the key; it never leaves an empty record behind.

pub mod attempt;
pub mod database;
