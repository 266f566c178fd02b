//! Document model
//!
//! A document is one record's serialization for one schema format, addressed
//! to one physical index version. The same record may produce 0, 1, or 2
//! documents per save depending on which schema versions are in flight.

use serde::{Deserialize, Serialize};

/// Which serialization format a document carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocFormat {
    /// The type's current `indexed_attributes` serialization
    Current,
    /// The type's previous-schema `legacy_indexed_attributes` serialization
    Legacy,
}

impl std::fmt::Display for DocFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// A serialized record ready to be written to an index version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The record's primary key (string-serialized)
    pub id: String,
    /// Type discriminator derived from the domain type's name
    pub type_tag: String,
    /// The serialized attribute payload
    pub body: serde_json::Value,
}

impl Document {
    /// Build a document from its parts
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        type_tag: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn doc_format_display() {
        assert_eq!(DocFormat::Current.to_string(), "current");
        assert_eq!(DocFormat::Legacy.to_string(), "legacy");
    }

    #[test]
    fn doc_format_serde_round_trip() {
        for format in [DocFormat::Current, DocFormat::Legacy] {
            let json = serde_json::to_string(&format).unwrap();
            let back: DocFormat = serde_json::from_str(&json).unwrap();
            assert_eq!(back, format);
        }
    }

    #[test]
    fn document_construction() {
        let doc = Document::new("42", "article", json!({"title": "hi"}));
        assert_eq!(doc.id, "42");
        assert_eq!(doc.type_tag, "article");
        assert_eq!(doc.body["title"], "hi");
    }

    #[test]
    fn document_serde_round_trip() {
        let doc = Document::new("7", "user", json!({"name": "ada", "age": 36}));
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
