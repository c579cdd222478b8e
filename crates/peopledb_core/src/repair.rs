//! Offline repair of corrupted encoded sub-fields.
//!
//! # Responsibility
//! - Scan every `contacts` row's raw `social_media` and `tags` text.
//! - Rewrite values whose decoded shape contradicts the declared type.
//! - Salvage comma-separated tag text written by external tools.
//!
//! # Invariants
//! - The whole pass commits in one transaction, or not at all.
//! - Only rows actually rewritten get `updated_at` refreshed.
//! - NULL/blank values are left alone; they already decode to zero values.
//! - A second pass right after a successful one fixes nothing.

use crate::codec::{encode_tags, inspect, EncodedShape, EMPTY_MAPPING, EMPTY_SEQUENCE};
use crate::db::migrations::ensure_contacts_schema;
use crate::db::DbError;
use crate::model::contact::{split_tag_list, ContactId};
use log::{error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepairResult<T> = Result<T, RepairError>;

#[derive(Debug)]
pub enum RepairError {
    Db(DbError),
}

impl Display for RepairError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "repair aborted, no changes persisted: {err}"),
        }
    }
}

impl Error for RepairError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepairError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepairError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What the repair pass did to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    /// Well-formed text of the wrong kind, replaced with the empty value.
    ReplacedWrongShape,
    /// Unparseable text, replaced with the empty value.
    ReplacedMalformed,
    /// Unparseable tag text re-encoded as a comma-separated label list.
    SalvagedCommaList,
}

impl FixAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReplacedWrongShape => "replaced_wrong_shape",
            Self::ReplacedMalformed => "replaced_malformed",
            Self::SalvagedCommaList => "salvaged_comma_list",
        }
    }
}

/// Fixes applied to one row. At least one field is `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFix {
    pub id: ContactId,
    pub social_media: Option<FixAction>,
    pub tags: Option<FixAction>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOptions {
    /// Report what would change, but roll back instead of committing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub scanned: usize,
    pub fixes: Vec<RowFix>,
    pub dry_run: bool,
}

impl RepairReport {
    /// Number of rows rewritten (or that would be, for a dry run).
    pub fn fixed(&self) -> usize {
        self.fixes.len()
    }
}

/// Repairs every row and commits the result atomically.
pub fn repair_contacts(conn: &mut Connection) -> RepairResult<RepairReport> {
    repair_contacts_with(conn, RepairOptions::default())
}

/// Repairs every row with explicit options.
pub fn repair_contacts_with(
    conn: &mut Connection,
    options: RepairOptions,
) -> RepairResult<RepairReport> {
    let started_at = Instant::now();
    info!(
        "event=repair module=repair status=start dry_run={}",
        options.dry_run
    );

    match run_pass(conn, options) {
        Ok(report) => {
            info!(
                "event=repair module=repair status=ok dry_run={} scanned={} fixed={} duration_ms={}",
                report.dry_run,
                report.scanned,
                report.fixed(),
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=repair module=repair status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

struct RawRow {
    id: ContactId,
    social_media: Option<String>,
    tags: Option<String>,
}

fn run_pass(conn: &mut Connection, options: RepairOptions) -> RepairResult<RepairReport> {
    ensure_contacts_schema(conn)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let rows = {
        let mut stmt = tx.prepare("SELECT id, social_media, tags FROM contacts ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        let mut raw_rows = Vec::new();
        while let Some(row) = rows.next()? {
            raw_rows.push(RawRow {
                id: row.get(0)?,
                social_media: raw_text(row.get(1)?),
                tags: raw_text(row.get(2)?),
            });
        }
        raw_rows
    };

    let mut report = RepairReport {
        scanned: rows.len(),
        fixes: Vec::new(),
        dry_run: options.dry_run,
    };

    for row in rows {
        let social_fix = repair_handles(row.social_media.as_deref());
        let tags_fix = repair_tags(row.tags.as_deref());
        if social_fix.is_none() && tags_fix.is_none() {
            continue;
        }

        let social_action = social_fix.as_ref().map(|(_, action)| *action);
        let tags_action = tags_fix.as_ref().map(|(_, action)| *action);
        warn!(
            "event=repair_row module=repair status=fixed id={} social_media={} tags={}",
            row.id,
            social_action.map_or("ok", FixAction::as_str),
            tags_action.map_or("ok", FixAction::as_str)
        );

        tx.execute(
            "UPDATE contacts
             SET
                social_media = COALESCE(?2, social_media),
                tags = COALESCE(?3, tags),
                updated_at = MAX(
                    CURRENT_TIMESTAMP,
                    COALESCE(created_at, ''),
                    COALESCE(updated_at, '')
                )
             WHERE id = ?1;",
            params![
                row.id,
                social_fix.map(|(value, _)| value),
                tags_fix.map(|(value, _)| value),
            ],
        )?;

        report.fixes.push(RowFix {
            id: row.id,
            social_media: social_action,
            tags: tags_action,
        });
    }

    if options.dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }
    Ok(report)
}

/// Returns the replacement text for a bad `social_media` value.
fn repair_handles(raw: Option<&str>) -> Option<(String, FixAction)> {
    match inspect(raw) {
        EncodedShape::Absent | EncodedShape::Mapping => None,
        EncodedShape::Sequence | EncodedShape::Other => {
            Some((EMPTY_MAPPING.to_string(), FixAction::ReplacedWrongShape))
        }
        EncodedShape::Malformed => Some((EMPTY_MAPPING.to_string(), FixAction::ReplacedMalformed)),
    }
}

/// Returns the replacement text for a bad `tags` value.
fn repair_tags(raw: Option<&str>) -> Option<(String, FixAction)> {
    match inspect(raw) {
        EncodedShape::Absent | EncodedShape::Sequence => None,
        EncodedShape::Mapping | EncodedShape::Other => {
            Some((EMPTY_SEQUENCE.to_string(), FixAction::ReplacedWrongShape))
        }
        EncodedShape::Malformed => {
            let text = raw.unwrap_or_default();
            if text.trim_start().starts_with('[') {
                Some((EMPTY_SEQUENCE.to_string(), FixAction::ReplacedMalformed))
            } else {
                let labels = split_tag_list(text);
                Some((encode_tags(&labels), FixAction::SalvagedCommaList))
            }
        }
    }
}

fn raw_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(text),
        Value::Integer(number) => Some(number.to_string()),
        Value::Real(number) => Some(number.to_string()),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
