//! Error types for the `taxbook-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval, reranking and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A parent id could not be resolved in the parent store.
    #[error("Parent document not found: {0}")]
    ParentNotFound(String),

    /// A document source or manifest could not be read.
    #[error("Document source error: {0}")]
    Source(String),

    /// A batch ingestion run failed. The previously active index is untouched.
    #[error("Ingestion failed: {message}")]
    Ingestion {
        /// A description of the failure.
        message: String,
    },

    /// Query-time retrieval failed.
    #[error("Retrieval failed: {message}")]
    Retrieval {
        /// A description of the failure.
        message: String,
    },

    /// A reranking capability could not be reached or returned an error.
    #[error("Reranker error ({reranker}): {message}")]
    Reranker {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation-model reranker returned output that does not match
    /// the verdict schema.
    #[error("Rerank output could not be parsed: {message}")]
    RerankParse {
        /// A description of the failure.
        message: String,
    },

    /// The generation model failed or timed out.
    #[error("Generation failed: {message}")]
    Generation {
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
