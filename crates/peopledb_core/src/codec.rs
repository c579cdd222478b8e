//! Text encoding for semi-structured contact sub-fields.
//!
//! # Responsibility
//! - Encode `social_media` (mapping) and `tags` (sequence) as JSON text.
//! - Decode stored text back, failing soft on the read path.
//!
//! # Invariants
//! - Empty values encode to explicit markers (`{}` / `[]`), never `""`.
//! - Absent or blank stored text decodes to the zero value without error.
//! - A decoded mapping is never returned for `tags`, nor a sequence for
//!   `social_media`.

use crate::model::contact::SocialHandles;
use log::warn;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const EMPTY_MAPPING: &str = "{}";
pub const EMPTY_SEQUENCE: &str = "[]";

pub type CodecResult<T> = Result<T, CodecError>;

/// Structural kind of a JSON value, used in shape errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Mapping,
    Sequence,
    Scalar,
}

impl Display for JsonKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mapping => write!(f, "mapping"),
            Self::Sequence => write!(f, "sequence"),
            Self::Scalar => write!(f, "scalar"),
        }
    }
}

#[derive(Debug)]
pub enum CodecError {
    /// Stored text is not valid JSON.
    Malformed(serde_json::Error),
    /// Stored text is valid JSON of the wrong kind.
    WrongShape { expected: JsonKind, found: JsonKind },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed encoded field: {err}"),
            Self::WrongShape { expected, found } => {
                write!(f, "encoded field is a {found}, expected a {expected}")
            }
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::WrongShape { .. } => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

/// Shape of one raw stored value, as seen by the repair utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedShape {
    /// NULL or blank text.
    Absent,
    Mapping,
    Sequence,
    /// Well-formed JSON that is neither a mapping nor a sequence.
    Other,
    /// Not JSON at all.
    Malformed,
}

pub fn encode_handles(handles: &SocialHandles) -> String {
    if handles.is_empty() {
        return EMPTY_MAPPING.to_string();
    }
    Value::Object(
        handles
            .iter()
            .map(|(platform, handle)| (platform.clone(), Value::String(handle.clone())))
            .collect(),
    )
    .to_string()
}

pub fn encode_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        return EMPTY_SEQUENCE.to_string();
    }
    Value::Array(tags.iter().cloned().map(Value::String).collect()).to_string()
}

/// Decodes stored `social_media` text.
pub fn decode_handles(raw: Option<&str>) -> CodecResult<SocialHandles> {
    let Some(value) = parse_present(raw)? else {
        return Ok(SocialHandles::new());
    };
    match value {
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(platform, handle)| (platform, scalar_text(handle)))
            .collect()),
        other => Err(CodecError::WrongShape {
            expected: JsonKind::Mapping,
            found: kind_of(&other),
        }),
    }
}

/// Decodes stored `tags` text.
pub fn decode_tags(raw: Option<&str>) -> CodecResult<Vec<String>> {
    let Some(value) = parse_present(raw)? else {
        return Ok(Vec::new());
    };
    match value {
        Value::Array(items) => Ok(items.into_iter().map(scalar_text).collect()),
        other => Err(CodecError::WrongShape {
            expected: JsonKind::Sequence,
            found: kind_of(&other),
        }),
    }
}

/// Read-path variant of [`decode_handles`]: substitutes an empty mapping on
/// any decode failure and records a metadata-only warning.
pub fn decode_handles_or_default(raw: Option<&str>, row_id: i64) -> SocialHandles {
    decode_handles(raw).unwrap_or_else(|err| {
        warn!(
            "event=decode_fallback module=codec status=soft_fail field=social_media id={} reason={}",
            row_id,
            failure_reason(&err)
        );
        SocialHandles::new()
    })
}

/// Read-path variant of [`decode_tags`].
pub fn decode_tags_or_default(raw: Option<&str>, row_id: i64) -> Vec<String> {
    decode_tags(raw).unwrap_or_else(|err| {
        warn!(
            "event=decode_fallback module=codec status=soft_fail field=tags id={} reason={}",
            row_id,
            failure_reason(&err)
        );
        Vec::new()
    })
}

/// Classifies raw stored text without committing to an expected type.
pub fn inspect(raw: Option<&str>) -> EncodedShape {
    match parse_present(raw) {
        Ok(None) => EncodedShape::Absent,
        Ok(Some(Value::Object(_))) => EncodedShape::Mapping,
        Ok(Some(Value::Array(_))) => EncodedShape::Sequence,
        Ok(Some(_)) => EncodedShape::Other,
        Err(_) => EncodedShape::Malformed,
    }
}

fn parse_present(raw: Option<&str>) -> CodecResult<Option<Value>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> JsonKind {
    match value {
        Value::Object(_) => JsonKind::Mapping,
        Value::Array(_) => JsonKind::Sequence,
        _ => JsonKind::Scalar,
    }
}

fn failure_reason(err: &CodecError) -> &'static str {
    match err {
        CodecError::Malformed(_) => "malformed",
        CodecError::WrongShape { .. } => "wrong_shape",
    }
}
