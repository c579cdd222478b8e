//! Domain model for contact records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep write inputs (`NewContact`, `ContactPatch`) separate from the
//!   read model (`Contact`).
//!
//! # Invariants
//! - Deletion is a hard delete; there is no tombstone state.

pub mod contact;
