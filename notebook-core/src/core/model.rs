//! Typed workbook, page and note values and their stored record shapes.
//!
//! Records coming back from the store are untrusted: every required field is
//! checked on decode and a missing or mistyped one becomes
//! [`NotebookError::MalformedRecord`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::fmt;

use crate::core::document::{CollectionPath, DocumentRecord, Fields};
use crate::core::error::{NotebookError, Result};

/// Which level of the hierarchy an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Workbook,
    Page,
    Note,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Workbook => "Workbook",
            Self::Page => "Page",
            Self::Note => "Note",
        };
        f.write_str(name)
    }
}

/// Top-level container, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

/// Container nested under one workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub workbook_id: String,
    pub name: String,
}

/// A titled rich-text note nested under one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub workbook_id: String,
    pub page_id: String,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

// Stored field names.
pub(crate) const FIELD_NAME: &str = "name";
pub(crate) const FIELD_USER_ID: &str = "userId";
pub(crate) const FIELD_TITLE: &str = "title";
pub(crate) const FIELD_TEXT: &str = "text";
pub(crate) const FIELD_CREATED_AT: &str = "createdAt";
pub(crate) const FIELD_LAST_MODIFIED: &str = "lastModified";

/// Formats a timestamp as fixed-width RFC 3339 with milliseconds, so that
/// string order matches time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reads typed fields out of one record, naming the record in every error.
struct FieldReader<'a> {
    collection: &'a CollectionPath,
    record: &'a DocumentRecord,
}

impl<'a> FieldReader<'a> {
    fn new(collection: &'a CollectionPath, record: &'a DocumentRecord) -> Self {
        Self { collection, record }
    }

    fn malformed(&self, reason: String) -> NotebookError {
        NotebookError::MalformedRecord {
            collection: self.collection.clone(),
            id: self.record.id.clone(),
            reason,
        }
    }

    fn string(&self, field: &str) -> Result<String> {
        match self.record.fields.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.malformed(format!("field '{field}' is not a string: {other}"))),
            None => Err(self.malformed(format!("missing field '{field}'"))),
        }
    }

    fn timestamp(&self, field: &str) -> Result<DateTime<Utc>> {
        let raw = self.string(field)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| self.malformed(format!("field '{field}' is not a timestamp: {e}")))
    }
}

impl Workbook {
    pub(crate) fn to_fields(name: &str, owner_id: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), Value::from(name));
        fields.insert(FIELD_USER_ID.to_string(), Value::from(owner_id));
        fields
    }

    pub(crate) fn from_record(record: &DocumentRecord) -> Result<Self> {
        let collection = CollectionPath::Workbooks;
        let reader = FieldReader::new(&collection, record);
        Ok(Self {
            id: record.id.clone(),
            name: reader.string(FIELD_NAME)?,
            owner_id: reader.string(FIELD_USER_ID)?,
        })
    }
}

impl Page {
    pub(crate) fn to_fields(name: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), Value::from(name));
        fields
    }

    pub(crate) fn from_record(workbook_id: &str, record: &DocumentRecord) -> Result<Self> {
        let collection = CollectionPath::pages(workbook_id);
        let reader = FieldReader::new(&collection, record);
        Ok(Self {
            id: record.id.clone(),
            workbook_id: workbook_id.to_string(),
            name: reader.string(FIELD_NAME)?,
        })
    }
}

impl Note {
    pub(crate) fn to_fields(
        title: &str,
        text: &str,
        created_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    ) -> Fields {
        let mut fields = Self::edit_fields(title, text, last_modified);
        fields.insert(
            FIELD_CREATED_AT.to_string(),
            Value::from(format_timestamp(created_at)),
        );
        fields
    }

    /// The fields an edit rewrites; `createdAt` is never among them.
    pub(crate) fn edit_fields(title: &str, text: &str, last_modified: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_TITLE.to_string(), Value::from(title));
        fields.insert(FIELD_TEXT.to_string(), Value::from(text));
        fields.insert(
            FIELD_LAST_MODIFIED.to_string(),
            Value::from(format_timestamp(last_modified)),
        );
        fields
    }

    pub(crate) fn from_record(
        workbook_id: &str,
        page_id: &str,
        record: &DocumentRecord,
    ) -> Result<Self> {
        let collection = CollectionPath::notes(workbook_id, page_id);
        let reader = FieldReader::new(&collection, record);
        let created_at = reader.timestamp(FIELD_CREATED_AT)?;
        let last_modified = reader.timestamp(FIELD_LAST_MODIFIED)?;
        if last_modified < created_at {
            return Err(reader.malformed("lastModified precedes createdAt".to_string()));
        }
        Ok(Self {
            id: record.id.clone(),
            workbook_id: workbook_id.to_string(),
            page_id: page_id.to_string(),
            title: reader.string(FIELD_TITLE)?,
            text: reader.string(FIELD_TEXT)?,
            created_at,
            last_modified,
        })
    }

    /// Case-insensitive substring match on title or text.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.text.to_lowercase().contains(needle_lower)
    }
}

/// Sorts notes most-recently-modified first.
pub(crate) fn sort_recent_first(notes: &mut [Note]) {
    notes.sort_by_key(|n| Reverse(n.last_modified));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(id: &str, fields: serde_json::Value) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(whole), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_note_round_trips_through_fields() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let modified = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        let rec = DocumentRecord {
            id: "n1".to_string(),
            fields: Note::to_fields("A", "<p>hello</p>", created, modified),
        };
        let note = Note::from_record("w1", "p1", &rec).unwrap();
        assert_eq!(note.title, "A");
        assert_eq!(note.page_id, "p1");
        assert_eq!(note.created_at, created);
        assert_eq!(note.last_modified, modified);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let rec = record("w1", json!({"name": "Personal"}));
        let err = Workbook::from_record(&rec).unwrap_err();
        match err {
            NotebookError::MalformedRecord { id, reason, .. } => {
                assert_eq!(id, "w1");
                assert!(reason.contains("userId"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mistyped_field_is_malformed() {
        let rec = record("p1", json!({"name": 42}));
        assert!(matches!(
            Page::from_record("w1", &rec),
            Err(NotebookError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_note_with_time_travel_is_malformed() {
        let rec = record(
            "n1",
            json!({
                "title": "",
                "text": "x",
                "createdAt": "2024-05-02T00:00:00.000Z",
                "lastModified": "2024-05-01T00:00:00.000Z",
            }),
        );
        assert!(Note::from_record("w", "p", &rec).is_err());
    }

    #[test]
    fn test_note_search_is_case_insensitive() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let note = Note {
            id: "n".to_string(),
            workbook_id: "w".to_string(),
            page_id: "p".to_string(),
            title: "Groceries".to_string(),
            text: "<p>Buy MILK</p>".to_string(),
            created_at: ts,
            last_modified: ts,
        };
        assert!(note.matches("milk"));
        assert!(note.matches("grocer"));
        assert!(!note.matches("bread"));
    }
}
