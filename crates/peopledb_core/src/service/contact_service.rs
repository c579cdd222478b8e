//! Contact use-case service.
//!
//! # Responsibility
//! - Provide the front-end contract: add/get/list/update/delete, search,
//!   tag filtering, tag listing and CSV export.
//! - Normalize tag sets before they reach the repository.
//!
//! # Invariants
//! - Validation failures are reported before any persistence attempt.
//! - Not-found is `None`/`false`; only storage and export failures are errors.
//! - Storage failures are returned as-is; nothing is retried here.

use crate::export::{export_file_name, project, write_csv, ExportError};
use crate::model::contact::{
    normalize_tags, Contact, ContactId, ContactPatch, ContactValidationError, NewContact,
};
use crate::repo::contact_repo::{ContactRepository, RepoError};
use chrono::{DateTime, Local, TimeZone};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

/// Service error for contact use-cases.
#[derive(Debug)]
pub enum ContactServiceError {
    /// Input rejected before persistence.
    Validation(ContactValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Export destination or serialization failure.
    Export(ExportError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ContactServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent contact state: {details}")
            }
        }
    }
}

impl Error for ContactServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for ContactServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ContactValidationError> for ContactServiceError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ExportError> for ContactServiceError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

pub type ServiceResult<T> = Result<T, ContactServiceError>;

/// Contact service facade over repository implementations.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds one contact and returns it as stored.
    pub fn add(&self, mut contact: NewContact) -> ServiceResult<Contact> {
        contact.validate()?;
        contact.tags = normalize_tags(&contact.tags);

        let id = self.repo.add(&contact)?;
        info!("event=contact_add module=service status=ok id={id}");
        self.repo
            .get(id)?
            .ok_or(ContactServiceError::InconsistentState(
                "created contact not found in read-back",
            ))
    }

    pub fn get(&self, id: ContactId) -> ServiceResult<Option<Contact>> {
        Ok(self.repo.get(id)?)
    }

    /// Lists every contact ordered by name.
    pub fn list_all(&self) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.list_all()?)
    }

    /// Merges provided fields over the stored contact.
    ///
    /// Returns `Ok(None)` when `id` does not exist, otherwise the contact as
    /// read back after the write.
    pub fn update(
        &mut self,
        id: ContactId,
        mut patch: ContactPatch,
    ) -> ServiceResult<Option<Contact>> {
        patch.validate()?;
        if let Some(tags) = patch.tags.as_mut() {
            let normalized = normalize_tags(tags);
            *tags = normalized;
        }

        if !self.repo.update(id, &patch)? {
            info!("event=contact_update module=service status=not_found id={id}");
            return Ok(None);
        }
        info!("event=contact_update module=service status=ok id={id}");
        self.repo
            .get(id)?
            .map(Some)
            .ok_or(ContactServiceError::InconsistentState(
                "updated contact not found in read-back",
            ))
    }

    /// Permanently removes one contact. Returns `false` when absent.
    pub fn delete(&self, id: ContactId) -> ServiceResult<bool> {
        let deleted = self.repo.delete(id)?;
        info!(
            "event=contact_delete module=service status={} id={id}",
            if deleted { "ok" } else { "not_found" }
        );
        Ok(deleted)
    }

    /// Substring search over name, nickname and raw tag text.
    ///
    /// The query is matched as given, surrounding whitespace included.
    pub fn search(&self, query: &str) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.search(query)?)
    }

    /// Contacts carrying `label` (case-insensitive). A blank label matches
    /// nothing.
    pub fn filter_by_tag(&self, label: &str) -> ServiceResult<Vec<Contact>> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.filter_by_tag(label)?)
    }

    pub fn all_tags(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.all_tags()?)
    }

    /// Writes every contact as CSV into `dir` and returns the file path.
    ///
    /// The file name is stamped with local time to the second.
    pub fn export_csv(&self, dir: &Path) -> ServiceResult<PathBuf> {
        self.export_csv_stamped(dir, &Local::now())
    }

    /// Like [`Self::export_csv`] with an explicit stamp. Fails with
    /// `ExportError::AlreadyExists` instead of replacing an earlier export.
    pub fn export_csv_stamped<Tz>(&self, dir: &Path, at: &DateTime<Tz>) -> ServiceResult<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let contacts = self.repo.list_all()?;
        let path = dir.join(export_file_name(at));

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                warn!("event=contact_export module=service status=exists");
                return Err(ExportError::AlreadyExists(path).into());
            }
            Err(err) => return Err(ExportError::from(err).into()),
        };
        write_csv(&project(&contacts), BufWriter::new(file))?;
        info!(
            "event=contact_export module=service status=ok rows={}",
            contacts.len()
        );
        Ok(path)
    }
}
