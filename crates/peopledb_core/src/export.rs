//! Tabular export projection for contacts.
//!
//! # Responsibility
//! - Flatten contacts into fixed-order rows (`project`).
//! - Serialize rows as CSV and name export files.
//!
//! # Invariants
//! - `project` is pure: no store access, no I/O.
//! - Column order always follows `EXPORT_HEADERS`.

use crate::codec::encode_handles;
use crate::model::contact::Contact;
use chrono::{DateTime, TimeZone};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::PathBuf;

pub const EXPORT_HEADERS: [&str; 12] = [
    "ID",
    "Name",
    "Nickname",
    "Birthday",
    "Address",
    "Personality Notes",
    "Social Media",
    "Tags",
    "Like as Friend",
    "Like Romantically",
    "Created At",
    "Updated At",
];

const EXPORT_FILE_PREFIX: &str = "contacts_export_";

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
    /// An export with the same stamp already exists; it is never overwritten.
    AlreadyExists(PathBuf),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "csv export failed: {err}"),
            Self::Io(err) => write!(f, "export destination failed: {err}"),
            Self::AlreadyExists(path) => {
                write!(f, "export file `{}` already exists", path.display())
            }
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::AlreadyExists(_) => None,
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// One flattened contact, already rendered to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow(pub [String; 12]);

impl ExportRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

/// Flattens contacts into export rows, one per contact, preserving order.
pub fn project(contacts: &[Contact]) -> Vec<ExportRow> {
    contacts.iter().map(project_one).collect()
}

fn project_one(contact: &Contact) -> ExportRow {
    ExportRow([
        contact.id.to_string(),
        contact.name.clone(),
        contact.nickname.clone(),
        contact.birthday.clone(),
        contact.address.clone(),
        contact.personality_notes.clone(),
        encode_handles(&contact.social_media),
        contact.tags.join(", "),
        yes_no(contact.like_as_friend).to_string(),
        yes_no(contact.like_romantically).to_string(),
        contact.created_at.clone(),
        contact.updated_at.clone(),
    ])
}

/// Writes a header line plus every row as CSV.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> ExportResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;
    for row in rows {
        wtr.write_record(row.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export file name stamped to second granularity, e.g.
/// `contacts_export_20240131_235959.csv`.
pub fn export_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{EXPORT_FILE_PREFIX}{}.csv", at.format("%Y%m%d_%H%M%S"))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
