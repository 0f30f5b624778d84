//! Configuration for ingestion, retrieval and answering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How documents are indexed and retrieved.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalStrategy {
    /// Index small child chunks, answer with their deduplicated parents.
    #[default]
    ParentChild,
    /// Index parent-sized chunks directly and answer with them.
    Standard,
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParentChild => f.write_str("parent-child"),
            Self::Standard => f.write_str("standard"),
        }
    }
}

impl FromStr for RetrievalStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent-child" | "parent_child" => Ok(Self::ParentChild),
            "standard" => Ok(Self::Standard),
            other => Err(RagError::Config(format!("unknown retrieval strategy '{other}'"))),
        }
    }
}

/// Configuration parameters for the answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum parent chunk size in characters.
    pub parent_chunk_size: usize,
    /// Number of overlapping characters between consecutive parent chunks.
    pub parent_chunk_overlap: usize,
    /// Maximum child chunk size in characters.
    pub child_chunk_size: usize,
    /// Number of child hits requested from the vector index.
    pub top_k: usize,
    /// Minimum relevance score kept by the similarity reranker.
    pub rerank_threshold: f32,
    /// Sampling temperature for the generation model.
    pub temperature: f32,
    /// Base name of the vector collection.
    pub collection: String,
    /// Indexing and retrieval strategy.
    pub strategy: RetrievalStrategy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            parent_chunk_size: 2000,
            parent_chunk_overlap: 200,
            child_chunk_size: 400,
            top_k: 30,
            rerank_threshold: 0.5,
            temperature: 0.0,
            collection: "taxbook".to_string(),
            strategy: RetrievalStrategy::ParentChild,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum parent chunk size in characters.
    pub fn parent_chunk_size(mut self, size: usize) -> Self {
        self.config.parent_chunk_size = size;
        self
    }

    /// Set the overlap between consecutive parent chunks in characters.
    pub fn parent_chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.parent_chunk_overlap = overlap;
        self
    }

    /// Set the maximum child chunk size in characters.
    pub fn child_chunk_size(mut self, size: usize) -> Self {
        self.config.child_chunk_size = size;
        self
    }

    /// Set the number of child hits requested from the vector index.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the relevance threshold of the similarity reranker.
    pub fn rerank_threshold(mut self, threshold: f32) -> Self {
        self.config.rerank_threshold = threshold;
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the base collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the retrieval strategy.
    pub fn strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - any chunk size is zero
    /// - `parent_chunk_overlap >= parent_chunk_size`
    /// - `child_chunk_size > parent_chunk_size`
    /// - `top_k == 0`
    /// - `rerank_threshold` is outside `[0, 1]` or `temperature` outside `[0, 2]`
    /// - `collection` is empty
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.parent_chunk_size == 0 || config.child_chunk_size == 0 {
            return Err(RagError::Config("chunk sizes must be greater than zero".to_string()));
        }
        if config.parent_chunk_overlap >= config.parent_chunk_size {
            return Err(RagError::Config(format!(
                "parent_chunk_overlap ({}) must be less than parent_chunk_size ({})",
                config.parent_chunk_overlap, config.parent_chunk_size
            )));
        }
        if config.child_chunk_size > config.parent_chunk_size {
            return Err(RagError::Config(format!(
                "child_chunk_size ({}) must not exceed parent_chunk_size ({})",
                config.child_chunk_size, config.parent_chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&config.rerank_threshold) {
            return Err(RagError::Config(format!(
                "rerank_threshold ({}) must be within [0, 1]",
                config.rerank_threshold
            )));
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(RagError::Config(format!(
                "temperature ({}) must be within [0, 2]",
                config.temperature
            )));
        }
        if config.collection.trim().is_empty() {
            return Err(RagError::Config("collection name must not be empty".to_string()));
        }
        Ok(config)
    }
}
