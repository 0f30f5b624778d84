//! Reranking by an external similarity (cross-encoder) service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::document::{Document, keys};
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// Default minimum relevance score kept by [`SimilarityReranker`].
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Relevance of one submitted document, addressed by its position in the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RelevanceScore {
    /// Index of the document in the submitted list.
    pub index: usize,
    /// Relevance to the query; higher is more relevant.
    pub relevance_score: f32,
}

/// A reranking capability: question plus texts in, one score per text out.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Score every entry of `documents` against `query`.
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>>;
}

/// Keeps candidates whose external relevance score reaches a threshold,
/// sorted by descending score.
///
/// The service addresses documents by index, so nothing about the
/// candidates needs to survive the round trip. Each kept document gains a
/// `relevance_score` metadata entry.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::{SimilarityReranker, cohere::CohereScorer};
///
/// let reranker = SimilarityReranker::new(Arc::new(CohereScorer::from_env()?));
/// let kept = reranker.rerank("Wie versteuere ich Eigenleistungen?", &candidates).await?;
/// ```
pub struct SimilarityReranker {
    scorer: Arc<dyn RelevanceScorer>,
    threshold: f32,
}

impl SimilarityReranker {
    /// Create a reranker with the [`DEFAULT_THRESHOLD`].
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer, threshold: DEFAULT_THRESHOLD }
    }

    /// Set the minimum relevance score.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// The minimum relevance score.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[async_trait]
impl Reranker for SimilarityReranker {
    fn name(&self) -> &str {
        self.scorer.name()
    }

    async fn rerank(&self, question: &str, candidates: &[Document]) -> Result<Vec<Document>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|doc| doc.content.as_str()).collect();
        let mut scores = self.scorer.score(question, &texts).await.map_err(|e| {
            error!(reranker = self.scorer.name(), error = %e, "similarity scoring failed");
            e
        })?;

        let mut seen = vec![false; candidates.len()];
        for score in &scores {
            if score.index >= candidates.len() || seen[score.index] {
                return Err(RagError::Reranker {
                    reranker: self.scorer.name().to_string(),
                    message: format!(
                        "score addresses index {} of {} candidates more than once or out of range",
                        score.index,
                        candidates.len()
                    ),
                });
            }
            seen[score.index] = true;
        }

        scores.sort_by(|a, b| {
            b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal)
        });

        let kept: Vec<Document> = scores
            .iter()
            .filter(|score| score.relevance_score >= self.threshold)
            .map(|score| {
                let doc = &candidates[score.index];
                debug!(document = %doc.label(), score = score.relevance_score, "kept by similarity");
                doc.clone().with_metadata(keys::RELEVANCE_SCORE, f64::from(score.relevance_score))
            })
            .collect();

        info!(
            reranker = self.scorer.name(),
            before = candidates.len(),
            after = kept.len(),
            threshold = self.threshold,
            "similarity rerank"
        );
        Ok(kept)
    }
}
