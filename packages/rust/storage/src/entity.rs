//! Generic entity model for the store adapter.
//!
//! Entities are (kind, key, field map) triples. Field values carry enough
//! shape for the civic record set: strings, booleans, timestamps, the
//! aligned list types, cross-entity references, and a long-text variant that
//! storage engines must keep out of secondary index structures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity kind for election records.
pub const KIND_ELECTION: &str = "Election";
/// Entity kind for candidate records.
pub const KIND_CANDIDATE: &str = "Candidate";
/// Entity kind for news-article records.
pub const KIND_NEWS_ARTICLE: &str = "NewsArticle";

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Short, queryable string.
    Str(String),
    /// Large text body, excluded from secondary indexing.
    LongText(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    StrList(Vec<String>),
    BoolList(Vec<bool>),
    /// Reference to another entity by (kind, key).
    KeyRef { kind: String, key: String },
}

impl FieldValue {
    /// Whether this value may participate in secondary index structures.
    pub fn indexable(&self) -> bool {
        !matches!(self, Self::LongText(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long_text(&self) -> Option<&str> {
        match self {
            Self::LongText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool_list(&self) -> Option<&[bool]> {
        match self {
            Self::BoolList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_key_ref(&self) -> Option<(&str, &str)> {
        match self {
            Self::KeyRef { kind, key } => Some((kind, key)),
            _ => None,
        }
    }
}

/// Named fields of an entity. `BTreeMap` keeps serialization deterministic.
pub type FieldMap = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stored record: kind-scoped, key-addressed field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub key: String,
    pub fields: FieldMap,
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Split fields into (indexable, long-text) maps for engines that build
    /// secondary indexes.
    pub fn partition_fields(&self) -> (FieldMap, FieldMap) {
        let mut props = FieldMap::new();
        let mut blobs = FieldMap::new();
        for (name, value) in &self.fields {
            if value.indexable() {
                props.insert(name.clone(), value.clone());
            } else {
                blobs.insert(name.clone(), value.clone());
            }
        }
        (props, blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_not_indexable() {
        assert!(!FieldValue::LongText("body".into()).indexable());
        assert!(FieldValue::Str("title".into()).indexable());
        assert!(FieldValue::Bool(true).indexable());
    }

    #[test]
    fn partition_separates_long_text() {
        let entity = Entity::new(KIND_NEWS_ARTICLE, "abc")
            .with_field("title", FieldValue::Str("t".into()))
            .with_field("content", FieldValue::LongText("long body".into()));

        let (props, blobs) = entity.partition_fields();
        assert!(props.contains_key("title"));
        assert!(!props.contains_key("content"));
        assert!(blobs.contains_key("content"));
    }

    #[test]
    fn field_value_serde_roundtrip() {
        let value = FieldValue::KeyRef {
            kind: KIND_CANDIDATE.into(),
            key: "deadbeef".into(),
        };
        let json = serde_json::to_string(&value).expect("serialize");
        let parsed: FieldValue = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, value);
        assert_eq!(parsed.as_key_ref(), Some((KIND_CANDIDATE, "deadbeef")));
    }
}
