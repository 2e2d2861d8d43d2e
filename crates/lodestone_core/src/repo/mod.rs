//! Repository layer: uniform data-access operations over a store.
//!
//! # Responsibility
//! - Translate repository operations into declarative store queries.
//! - Apply the capability-aware translation attach and the default
//!   ordering/pagination contract consistently.
//!
//! # Invariants
//! - Runtime-supplied field, relation and column names are validated
//!   against the entity definition before any store call.
//! - Store failures pass through unchanged; the repository never retries
//!   or recovers locally.

pub mod base_repo;
