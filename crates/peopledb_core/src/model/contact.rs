//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record and its write-side inputs.
//! - Provide validation and tag-set normalization shared by all write paths.
//!
//! # Invariants
//! - `id` is store-assigned and never reused after deletion.
//! - `name` must be non-empty after trimming.
//! - `tags` is an ordered set: no blanks, no case-insensitive duplicates.
//! - `updated_at >= created_at`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned row identifier.
pub type ContactId = i64;

/// Platform name -> handle. Keys are unique, order is irrelevant.
pub type SocialHandles = BTreeMap<String, String>;

/// Canonical contact record as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub nickname: String,
    /// Free-form; the store does not validate dates.
    pub birthday: String,
    pub address: String,
    pub personality_notes: String,
    pub social_media: SocialHandles,
    pub tags: Vec<String>,
    pub like_as_friend: bool,
    pub like_romantically: bool,
    /// SQLite `CURRENT_TIMESTAMP` text, UTC.
    pub created_at: String,
    /// Refreshed on every successful update.
    pub updated_at: String,
}

/// Input for creating a contact. Every field except `name` defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub nickname: String,
    pub birthday: String,
    pub address: String,
    pub personality_notes: String,
    pub social_media: SocialHandles,
    pub tags: Vec<String>,
    pub like_as_friend: bool,
    pub like_romantically: bool,
}

impl NewContact {
    /// Creates an input with the given name and all other fields defaulted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_social(mut self, platform: impl Into<String>, handle: impl Into<String>) -> Self {
        self.social_media.insert(platform.into(), handle.into());
        self
    }

    /// Rejects inputs that must never reach persistence.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        validate_name(&self.name)
    }
}

/// Partial update. `None` means "not provided" and keeps the stored value;
/// `Some(..)` replaces it, including `Some(String::new())`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<String>,
    pub address: Option<String>,
    pub personality_notes: Option<String>,
    pub social_media: Option<SocialHandles>,
    pub tags: Option<Vec<String>>,
    pub like_as_friend: Option<bool>,
    pub like_romantically: Option<bool>,
}

impl ContactPatch {
    /// Validates only the fields that were provided.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        match self.name.as_deref() {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }

    /// Merges provided fields over `current`. Identity and timestamps are
    /// never touched here.
    pub fn apply_to(&self, current: &mut Contact) {
        if let Some(value) = &self.name {
            current.name = value.clone();
        }
        if let Some(value) = &self.nickname {
            current.nickname = value.clone();
        }
        if let Some(value) = &self.birthday {
            current.birthday = value.clone();
        }
        if let Some(value) = &self.address {
            current.address = value.clone();
        }
        if let Some(value) = &self.personality_notes {
            current.personality_notes = value.clone();
        }
        if let Some(value) = &self.social_media {
            current.social_media = value.clone();
        }
        if let Some(value) = &self.tags {
            current.tags = value.clone();
        }
        if let Some(value) = self.like_as_friend {
            current.like_as_friend = value;
        }
        if let Some(value) = self.like_romantically {
            current.like_romantically = value;
        }
    }
}

/// Write-side validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyName,
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "contact name is required"),
        }
    }
}

impl Error for ContactValidationError {}

fn validate_name(name: &str) -> Result<(), ContactValidationError> {
    if name.trim().is_empty() {
        return Err(ContactValidationError::EmptyName);
    }
    Ok(())
}

/// Normalizes a tag list into an ordered set.
///
/// Labels are stored exactly as given. Blank labels and exact repeats are
/// dropped; case variants such as `Rust` and `rust` are distinct labels.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(tags.len());
    for tag in tags {
        if tag.trim().is_empty() {
            continue;
        }
        if seen.insert(tag.as_str()) {
            normalized.push(tag.clone());
        }
    }
    normalized
}

/// Splits comma-separated user input into labels.
pub fn split_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, split_tag_list, Contact, ContactPatch, NewContact};
    use std::collections::BTreeMap;

    fn sample_contact() -> Contact {
        Contact {
            id: 7,
            name: "Ada".to_string(),
            nickname: "A".to_string(),
            birthday: "1815-12-10".to_string(),
            address: String::new(),
            personality_notes: "curious".to_string(),
            social_media: BTreeMap::from([("github".to_string(), "ada".to_string())]),
            tags: vec!["work".to_string()],
            like_as_friend: true,
            like_romantically: false,
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn new_contact_rejects_blank_name() {
        assert!(NewContact::new("   ").validate().is_err());
        assert!(NewContact::new("Ada").validate().is_ok());
    }

    #[test]
    fn patch_keeps_omitted_fields_and_replaces_empty_ones() {
        let mut contact = sample_contact();
        let patch = ContactPatch {
            nickname: Some(String::new()),
            like_romantically: Some(true),
            ..ContactPatch::default()
        };
        patch.apply_to(&mut contact);

        assert_eq!(contact.name, "Ada");
        assert_eq!(contact.nickname, "");
        assert_eq!(contact.personality_notes, "curious");
        assert!(contact.like_as_friend);
        assert!(contact.like_romantically);
    }

    #[test]
    fn patch_rejects_blank_name_only_when_provided() {
        assert!(ContactPatch::default().validate().is_ok());
        let patch = ContactPatch {
            name: Some(" ".to_string()),
            ..ContactPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn normalize_tags_drops_blanks_and_exact_repeats_only() {
        let tags = vec![
            "Work".to_string(),
            "friend".to_string(),
            "work".to_string(),
            "  ".to_string(),
            "Work".to_string(),
            " padded ".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags),
            vec!["Work", "friend", "work", " padded "]
        );
    }

    #[test]
    fn split_tag_list_drops_blank_segments() {
        assert_eq!(split_tag_list("work, friend,,  "), vec!["work", "friend"]);
    }
}
