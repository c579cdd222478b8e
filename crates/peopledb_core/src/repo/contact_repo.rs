//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, search, and tag-filter APIs over the `contacts` table.
//! - Convert encoded sub-fields at the read/write boundary via `codec`.
//! - Own transactional boundaries for read-merge-write updates.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths never fail on bad encoded sub-fields; they substitute the
//!   zero value instead (see `codec::decode_*_or_default`).
//! - Every row is read with one fixed column list; the column set is checked
//!   once in `try_new`.
//! - Result ordering is `name ASC, id ASC`.

use crate::codec::{
    decode_handles_or_default, decode_tags_or_default, encode_handles, encode_tags,
};
use crate::db::migrations::ensure_contacts_schema;
use crate::db::DbError;
use crate::model::contact::{
    Contact, ContactId, ContactPatch, ContactValidationError, NewContact,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Params, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    name,
    nickname,
    birthday,
    address,
    personality_notes,
    social_media,
    tags,
    like_as_friend,
    like_romantically,
    created_at,
    updated_at
FROM contacts";

const CONTACT_ORDER_SQL: &str = "ORDER BY name ASC, id ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and query operations.
///
/// Missing rows are not errors; they surface as `None` / `false`.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for contact operations.
pub trait ContactRepository {
    /// Inserts one contact and returns its store-assigned id.
    fn add(&self, contact: &NewContact) -> RepoResult<ContactId>;
    /// Gets one contact, or `None` when no row matches.
    fn get(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    /// Lists every contact ordered by name.
    fn list_all(&self) -> RepoResult<Vec<Contact>>;
    /// Merges `patch` over the stored row. Returns `false` for unknown ids.
    fn update(&mut self, id: ContactId, patch: &ContactPatch) -> RepoResult<bool>;
    /// Hard-deletes one contact. Returns `false` for unknown ids.
    fn delete(&self, id: ContactId) -> RepoResult<bool>;
    /// Case-insensitive (Unicode) substring match on name, nickname and raw
    /// tag text. An empty query matches every contact.
    fn search(&self, query: &str) -> RepoResult<Vec<Contact>>;
    /// Exact case-insensitive match against decoded tags.
    fn filter_by_tag(&self, label: &str) -> RepoResult<Vec<Contact>>;
    /// Distinct union of all decoded tags, sorted ascending.
    fn all_tags(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_contacts_schema(conn)?;
        Ok(Self { conn })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn add(&self, contact: &NewContact) -> RepoResult<ContactId> {
        contact.validate()?;

        // One statement, so both defaults read the same clock value.
        self.conn.execute(
            "INSERT INTO contacts (
                name,
                nickname,
                birthday,
                address,
                personality_notes,
                social_media,
                tags,
                like_as_friend,
                like_romantically,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP);",
            params![
                contact.name.as_str(),
                contact.nickname.as_str(),
                contact.birthday.as_str(),
                contact.address.as_str(),
                contact.personality_notes.as_str(),
                encode_handles(&contact.social_media),
                encode_tags(&contact.tags),
                contact.like_as_friend,
                contact.like_romantically,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        load_contact(self.conn, id)
    }

    fn list_all(&self) -> RepoResult<Vec<Contact>> {
        query_contacts(
            self.conn,
            &format!("{CONTACT_SELECT_SQL} {CONTACT_ORDER_SQL};"),
            [],
        )
    }

    fn update(&mut self, id: ContactId, patch: &ContactPatch) -> RepoResult<bool> {
        patch.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(mut contact) = load_contact(&tx, id)? else {
            return Ok(false);
        };
        patch.apply_to(&mut contact);

        let changed = tx.execute(
            "UPDATE contacts
             SET
                name = ?2,
                nickname = ?3,
                birthday = ?4,
                address = ?5,
                personality_notes = ?6,
                social_media = ?7,
                tags = ?8,
                like_as_friend = ?9,
                like_romantically = ?10,
                updated_at = MAX(
                    CURRENT_TIMESTAMP,
                    COALESCE(created_at, ''),
                    COALESCE(updated_at, '')
                )
             WHERE id = ?1;",
            params![
                id,
                contact.name.as_str(),
                contact.nickname.as_str(),
                contact.birthday.as_str(),
                contact.address.as_str(),
                contact.personality_notes.as_str(),
                encode_handles(&contact.social_media),
                encode_tags(&contact.tags),
                contact.like_as_friend,
                contact.like_romantically,
            ],
        )?;
        tx.commit()?;

        Ok(changed > 0)
    }

    fn delete(&self, id: ContactId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Contact>> {
        let needle = query.to_lowercase();
        let mut stmt = self
            .conn
            .prepare(&format!("{CONTACT_SELECT_SQL} {CONTACT_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            // Tags are matched on their raw encoded text, so fragments like
            // `","` also hit.
            let hit = ["name", "nickname", "tags"]
                .into_iter()
                .map(|column| read_text(row, column))
                .collect::<rusqlite::Result<Vec<_>>>()?
                .iter()
                .any(|text| text.to_lowercase().contains(&needle));
            if hit {
                contacts.push(parse_contact_row(row)?);
            }
        }
        Ok(contacts)
    }

    fn filter_by_tag(&self, label: &str) -> RepoResult<Vec<Contact>> {
        let wanted = label.to_lowercase();
        let contacts = self.list_all()?;
        Ok(contacts
            .into_iter()
            .filter(|contact| contact.tags.iter().any(|tag| tag.to_lowercase() == wanted))
            .collect())
    }

    fn all_tags(&self) -> RepoResult<Vec<String>> {
        let mut tags = BTreeSet::new();
        for contact in self.list_all()? {
            tags.extend(contact.tags);
        }
        Ok(tags.into_iter().collect())
    }
}

fn load_contact(conn: &Connection, id: ContactId) -> RepoResult<Option<Contact>> {
    let mut stmt = conn.prepare(&format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_contact_row(row)?));
    }
    Ok(None)
}

fn query_contacts<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<Contact>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut contacts = Vec::new();
    while let Some(row) = rows.next()? {
        contacts.push(parse_contact_row(row)?);
    }
    Ok(contacts)
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id: ContactId = row.get("id")?;
    let social_media = read_text(row, "social_media")?;
    let tags = read_text(row, "tags")?;

    Ok(Contact {
        id,
        name: read_text(row, "name")?,
        nickname: read_text(row, "nickname")?,
        birthday: read_text(row, "birthday")?,
        address: read_text(row, "address")?,
        personality_notes: read_text(row, "personality_notes")?,
        social_media: decode_handles_or_default(Some(social_media.as_str()), id),
        tags: decode_tags_or_default(Some(tags.as_str()), id),
        like_as_friend: read_flag(row, "like_as_friend")?,
        like_romantically: read_flag(row, "like_romantically")?,
        created_at: read_text(row, "created_at")?,
        updated_at: read_text(row, "updated_at")?,
    })
}

/// Reads a text column, mapping NULL to `""`. Rows written by older
/// releases may hold NULL in optional columns.
fn read_text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(match row.get::<_, Value>(column)? {
        Value::Null => String::new(),
        Value::Text(text) => text,
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Blob(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Reads a `BOOLEAN` column. SQLite has no strict boolean type, so accept
/// the encodings older writers produced; anything unrecognized is `false`.
fn read_flag(row: &Row<'_>, column: &str) -> rusqlite::Result<bool> {
    Ok(match row.get::<_, Value>(column)? {
        Value::Integer(number) => number != 0,
        Value::Real(number) => number != 0.0,
        Value::Text(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        ),
        Value::Null | Value::Blob(_) => false,
    })
}
