//! Core persistence layer for The People DB.
//! This crate is the single source of truth for contact record invariants.

pub mod codec;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repair;
pub mod repo;
pub mod service;

pub use codec::{CodecError, CodecResult, EncodedShape};
pub use export::{project, ExportError, ExportRow, EXPORT_HEADERS};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::contact::{
    normalize_tags, split_tag_list, Contact, ContactId, ContactPatch, ContactValidationError,
    NewContact, SocialHandles,
};
pub use repair::{
    repair_contacts, repair_contacts_with, FixAction, RepairError, RepairOptions, RepairReport,
    RowFix,
};
pub use repo::contact_repo::{ContactRepository, RepoError, RepoResult, SqliteContactRepository};
pub use service::contact_service::{ContactService, ContactServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
