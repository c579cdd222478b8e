//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep front-ends (CLI, TUI, web) decoupled from storage details.

pub mod contact_service;
