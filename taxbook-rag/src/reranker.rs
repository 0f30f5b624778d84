//! Reranker trait for filtering and reordering retrieved documents.
//!
//! Two strategies implement it:
//!
//! - [`SimilarityReranker`](crate::similarity::SimilarityReranker): scores
//!   every candidate with an external cross-encoder and keeps those at or
//!   above a threshold, best first
//! - [`LlmRelevanceReranker`](crate::classifier::LlmRelevanceReranker): asks
//!   a generation model to classify each candidate as relevant or not and
//!   keeps the relevant ones in their original order

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;

/// A second relevance pass over retrieved candidates.
///
/// Implementations return a new sequence and leave `candidates` untouched.
/// An empty candidate set is returned unchanged without calling any
/// external capability.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Filter and reorder `candidates` with respect to `question`.
    async fn rerank(&self, question: &str, candidates: &[Document]) -> Result<Vec<Document>>;
}

/// One relevance decision of a classifying reranker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RerankVerdict {
    /// Per-request identifier of the candidate.
    pub identifier: String,
    /// Whether the candidate helps answer the question.
    pub relevant: bool,
}

/// A no-op reranker that returns candidates unchanged.
///
/// Backs the `standard` answer mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    fn name(&self) -> &str {
        "noop"
    }

    async fn rerank(&self, _question: &str, candidates: &[Document]) -> Result<Vec<Document>> {
        Ok(candidates.to_vec())
    }
}
