//! Data types for documents, parent/child records, and search hits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known metadata keys.
pub mod keys {
    /// Origin identifier of the source file.
    pub const SOURCE: &str = "source";
    /// Page number within the source (0-based).
    pub const PAGE: &str = "page";
    /// Similarity or relevance score attached during retrieval.
    pub const SCORE: &str = "score";
    /// Score assigned by a similarity reranker.
    pub const RELEVANCE_SCORE: &str = "relevance_score";
    /// Ephemeral per-request identifier used by the generation-model reranker.
    pub const UUID: &str = "uuid";
    /// Matching child documents recorded as provenance on a parent.
    pub const SUB_DOCS: &str = "sub_docs";
    /// Back-reference from a child chunk to its parent.
    pub const PARENT_ID: &str = "parent_id";
    /// Character offset of a chunk within the text it was split from.
    pub const START_INDEX: &str = "start_index";
    /// Human-readable title of the source (manifest `link_name`).
    pub const TITLE: &str = "title";
    /// Article the source belongs to (manifest `article_name`).
    pub const ARTICLE: &str = "article";
}

/// A unit of text with free-form metadata.
///
/// Source documents always carry [`keys::SOURCE`] and [`keys::PAGE`].
/// Retrieval may add [`keys::SCORE`] or [`keys::SUB_DOCS`]; these are
/// advisory and never required for correctness.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The text content of the document.
    pub content: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: HashMap::new() }
    }

    /// Create a document for one page of a source file.
    pub fn page_of(content: impl Into<String>, source: impl Into<String>, page: u64) -> Self {
        let source: String = source.into();
        Self::new(content).with_metadata(keys::SOURCE, source).with_metadata(keys::PAGE, page)
    }

    /// Set a metadata entry, returning the updated document.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata entry, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(keys::SOURCE).and_then(Value::as_str)
    }

    /// The `page` metadata entry, if present.
    pub fn page(&self) -> Option<u64> {
        self.metadata.get(keys::PAGE).and_then(Value::as_u64)
    }

    /// The `score` metadata entry, if present.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get(keys::SCORE).and_then(Value::as_f64)
    }

    /// The per-request identifier assigned by a reranker, if present.
    pub fn uuid(&self) -> Option<&str> {
        self.metadata.get(keys::UUID).and_then(Value::as_str)
    }

    /// The matching children recorded as provenance, if present.
    pub fn sub_docs(&self) -> Option<Vec<Document>> {
        self.metadata
            .get(keys::SUB_DOCS)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// A `source__page` label used in log output.
    pub fn label(&self) -> String {
        match (self.source(), self.page()) {
            (Some(source), Some(page)) => format!("{source}__{page}"),
            (Some(source), None) => source.to_string(),
            _ => "<unknown>".to_string(),
        }
    }
}

/// A parent chunk together with its stable identifier.
///
/// Owned by the parent store and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParentRecord {
    /// Identifier, unique within one ingestion pass.
    pub parent_id: String,
    /// The full parent chunk.
    pub document: Document,
}

/// A child chunk indexed for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildRecord {
    /// Identifier of this child, unique within one ingestion pass.
    pub id: String,
    /// The [`ParentRecord`] this child was split from.
    pub parent_id: String,
    /// The child text and its metadata.
    pub document: Document,
    /// Embedding vector; empty until the vector index computes it.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A retrieved [`ChildRecord`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matching child.
    pub child: ChildRecord,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The full output of one chunking pass.
///
/// Every child's `parent_id` refers to exactly one entry of `parents`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    /// Parent chunks in source order.
    pub parents: Vec<ParentRecord>,
    /// Child chunks in source order.
    pub children: Vec<ChildRecord>,
}

impl From<Document> for Value {
    /// The same object `serde_json::to_value` produces, built without a
    /// fallible serializer.
    fn from(document: Document) -> Self {
        let mut object = serde_json::Map::new();
        object.insert("content".to_string(), Value::String(document.content));
        object.insert("metadata".to_string(), Value::Object(document.metadata.into_iter().collect()));
        Value::Object(object)
    }
}

impl Corpus {
    /// Children of the given parent, in order.
    pub fn children_of<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a ChildRecord> {
        self.children.iter().filter(move |child| child.parent_id == parent_id)
    }
}
