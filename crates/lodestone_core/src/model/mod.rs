//! Data model shared by the repository and store layers.
//!
//! # Responsibility
//! - Define entity metadata, scalar values, field maps and fetched
//!   records.
//! - Keep these shapes engine-neutral; only store implementations may
//!   translate them to a concrete query API.
//!
//! # Invariants
//! - Entities are opaque: the repository never interprets field values
//!   beyond the identifier and the declared key fields.

pub mod entity;
pub mod record;
pub mod value;
