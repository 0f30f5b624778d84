//! Hierarchical retrieval and grounded answering over a tax handbook.
//!
//! This crate provides:
//! - Parent-child chunking of paged handbook text
//! - A parent store plus a child vector index behind async traits
//! - Parent-child and standard (chunk-level) retrieval
//! - Similarity reranking and generation-model relevance classification
//! - Prompt assembly and answer generation
//! - Atomic re-ingestion behind a shared [`KnowledgeBase`]
//!
//! Hosted capabilities are feature gated: `openai` adds embeddings and chat
//! generation, `cohere` adds the rerank scorer.

pub mod answer;
pub mod chunking;
pub mod classifier;
pub mod config;
pub mod context;
pub mod docstore;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod inmemory;
pub mod knowledge;
pub mod reranker;
pub mod retriever;
pub mod similarity;
pub mod source;
pub mod vectorstore;

#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "openai")]
pub mod openai;

pub use answer::{AnswerEngine, AnswerEngineBuilder, AnswerMode, Assistant};
pub use chunking::{Chunker, ParentChildSplitter, RecursiveChunker, TextChunk, split};
pub use classifier::{JsonVerdictParser, LlmRelevanceReranker, VerdictParser};
pub use config::{RagConfig, RagConfigBuilder, RetrievalStrategy};
pub use context::{AnswerGenerator, NO_ANSWER, assemble, format_context};
pub use docstore::{DocStore, InMemoryDocStore};
pub use document::{ChildRecord, Corpus, Document, ParentRecord, SearchHit};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{GenerationRequest, Generator, OutputFormat};
pub use index::VectorIndex;
pub use ingest::{IndexHandle, IngestionReport, Ingestor};
pub use inmemory::InMemoryVectorStore;
pub use knowledge::KnowledgeBase;
pub use reranker::{NoOpReranker, RerankVerdict, Reranker};
pub use retriever::{EmptyRetriever, ParentChildRetriever, Retriever, StandardRetriever};
pub use similarity::{RelevanceScore, RelevanceScorer, SimilarityReranker};
pub use source::{DocumentSource, ManifestSource, StaticSource};
pub use vectorstore::VectorStore;
