//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce input validation before persistence.
//! - Not-found is an explicit `None`/`false` result, never an error.

pub mod contact_repo;
