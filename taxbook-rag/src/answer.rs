//! Question answering orchestrator.
//!
//! The [`AnswerEngine`] runs one strictly sequential chain per question:
//! retrieve → rerank → assemble → generate. It holds no index itself; the
//! caller hands it the [`Retriever`] to read from.
//!
//! # Example
//!
//! ```rust,ignore
//! use taxbook_rag::{AnswerEngine, AnswerMode, LlmRelevanceReranker};
//!
//! let engine = AnswerEngine::builder()
//!     .generator(generator.clone())
//!     .generation_reranker(Arc::new(LlmRelevanceReranker::new(generator)))
//!     .build()?;
//!
//! let answer = engine.answer(&knowledge_base, "Was kann ich abziehen?", AnswerMode::RerankGeneration).await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AnswerGenerator;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::knowledge::KnowledgeBase;
use crate::reranker::{NoOpReranker, Reranker};
use crate::retriever::Retriever;

/// Which reranking pass runs between retrieval and generation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerMode {
    /// No reranking; retrieved documents go straight to generation.
    Standard,
    /// External similarity reranking with a score threshold.
    RerankSimilarity,
    /// Generation-model relevance classification.
    #[default]
    RerankGeneration,
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::RerankSimilarity => f.write_str("rerank-similarity"),
            Self::RerankGeneration => f.write_str("rerank-generation"),
        }
    }
}

impl FromStr for AnswerMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "rerank-similarity" => Ok(Self::RerankSimilarity),
            "rerank-generation" => Ok(Self::RerankGeneration),
            other => Err(RagError::Config(format!("unknown answer mode '{other}'"))),
        }
    }
}

/// Runs retrieval, the reranker selected by [`AnswerMode`], and generation.
///
/// Construct one via [`AnswerEngine::builder()`].
pub struct AnswerEngine {
    similarity_reranker: Option<Arc<dyn Reranker>>,
    generation_reranker: Option<Arc<dyn Reranker>>,
    generator: AnswerGenerator,
}

impl AnswerEngine {
    /// Create a new [`AnswerEngineBuilder`].
    pub fn builder() -> AnswerEngineBuilder {
        AnswerEngineBuilder::default()
    }

    /// Whether `mode` can be served with the configured rerankers.
    pub fn supports(&self, mode: AnswerMode) -> bool {
        self.reranker_for(mode).is_ok()
    }

    fn reranker_for(&self, mode: AnswerMode) -> Result<Arc<dyn Reranker>> {
        let configured = match mode {
            AnswerMode::Standard => return Ok(Arc::new(NoOpReranker)),
            AnswerMode::RerankSimilarity => &self.similarity_reranker,
            AnswerMode::RerankGeneration => &self.generation_reranker,
        };
        configured
            .clone()
            .ok_or_else(|| RagError::Config(format!("answer mode '{mode}' has no reranker configured")))
    }

    /// Answer `question` from the documents `retriever` finds.
    ///
    /// An empty context is not an error: the answer says that nothing is known.
    ///
    /// # Errors
    ///
    /// Returns the typed failure of the stage that failed:
    /// [`RagError::Config`] for an unconfigured mode, [`RagError::Retrieval`],
    /// [`RagError::Reranker`] or [`RagError::RerankParse`], and
    /// [`RagError::Generation`].
    pub async fn answer(&self, retriever: &dyn Retriever, question: &str, mode: AnswerMode) -> Result<String> {
        let reranker = self.reranker_for(mode)?;

        let candidates = retriever.retrieve(question).await?;
        let context = reranker.rerank(question, &candidates).await?;
        info!(%mode, retrieved = candidates.len(), kept = context.len(), "context selected");

        self.generator.answer(question, &context).await
    }
}

/// Builder for constructing an [`AnswerEngine`].
///
/// The generator is required; each reranker enables its answer mode.
#[derive(Default)]
pub struct AnswerEngineBuilder {
    generator: Option<Arc<dyn Generator>>,
    temperature: f32,
    similarity_reranker: Option<Arc<dyn Reranker>>,
    generation_reranker: Option<Arc<dyn Reranker>>,
}

impl AnswerEngineBuilder {
    /// Set the generation model used for the final answer.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the temperature of the final answer (default 0.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the reranker serving [`AnswerMode::RerankSimilarity`].
    pub fn similarity_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.similarity_reranker = Some(reranker);
        self
    }

    /// Set the reranker serving [`AnswerMode::RerankGeneration`].
    pub fn generation_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.generation_reranker = Some(reranker);
        self
    }

    /// Build the [`AnswerEngine`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no generator is set.
    pub fn build(self) -> Result<AnswerEngine> {
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;
        Ok(AnswerEngine {
            similarity_reranker: self.similarity_reranker,
            generation_reranker: self.generation_reranker,
            generator: AnswerGenerator::new(generator).with_temperature(self.temperature),
        })
    }
}

/// The upward-facing `answer(question, mode)` operation over the currently
/// served knowledge base.
#[derive(Clone)]
pub struct Assistant {
    knowledge: Arc<KnowledgeBase>,
    engine: Arc<AnswerEngine>,
}

impl Assistant {
    /// Answer from `knowledge` with `engine`.
    pub fn new(knowledge: Arc<KnowledgeBase>, engine: Arc<AnswerEngine>) -> Self {
        Self { knowledge, engine }
    }

    /// The knowledge base queries are served from.
    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    /// The engine answering questions.
    pub fn engine(&self) -> &Arc<AnswerEngine> {
        &self.engine
    }

    /// Answer `question` using `mode`.
    pub async fn answer(&self, question: &str, mode: AnswerMode) -> Result<String> {
        self.engine.answer(self.knowledge.as_ref(), question, mode).await
    }
}
