//! Batch ingestion into a fresh collection.
//!
//! Every run builds into a newly named collection and a new parent store.
//! The caller receives a [`IndexHandle`] only when the whole run succeeded;
//! on failure the partial collection is dropped and whatever index was
//! previously served stays untouched.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chunking::{Chunker, ParentChildSplitter};
use crate::config::{RagConfig, RetrievalStrategy};
use crate::docstore::{DocStore, InMemoryDocStore};
use crate::document::{ChildRecord, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::retriever::{ParentChildRetriever, Retriever, StandardRetriever};
use crate::vectorstore::VectorStore;

/// Statistics of one completed ingestion run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestionReport {
    /// Collection the run built.
    pub collection: String,
    /// Strategy the collection was built for.
    pub strategy: RetrievalStrategy,
    /// Number of source documents (pages) ingested.
    pub source_documents: usize,
    /// Number of parent chunks stored. Zero for the standard strategy.
    pub parents: usize,
    /// Number of chunks embedded into the collection.
    pub indexed_chunks: usize,
}

/// Drop chunks with no text to embed. Blank pages still yield a parent,
/// which then simply has no children.
fn indexable(chunks: Vec<ChildRecord>) -> Vec<ChildRecord> {
    let total = chunks.len();
    let kept: Vec<ChildRecord> =
        chunks.into_iter().filter(|c| !c.document.content.trim().is_empty()).collect();
    if kept.len() < total {
        debug!(skipped = total - kept.len(), "skipping blank chunks");
    }
    kept
}

/// The product of a successful ingestion: a retriever ready to serve queries.
pub struct IndexHandle {
    /// Retriever over the freshly built collection.
    pub retriever: Arc<dyn Retriever>,
    /// What the run produced.
    pub report: IngestionReport,
}

/// Builds retrievers from documents.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::{Ingestor, InMemoryVectorStore, RagConfig};
///
/// let ingestor = Ingestor::new(RagConfig::default(), embedder, Arc::new(InMemoryVectorStore::new()));
/// let handle = ingestor.ingest(&pages).await?;
/// let docs = handle.retriever.retrieve("Abzug für Eigenleistungen").await?;
/// ```
#[derive(Clone)]
pub struct Ingestor {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    /// Create an ingestor writing into `store` with embeddings from `embedder`.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { config, embedder, store }
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Chunk, embed and index `documents` into a fresh collection.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] if any step fails. The fresh
    /// collection is dropped before returning.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IndexHandle> {
        let collection = format!("{}-{}", self.config.collection, Uuid::new_v4().simple());
        let index = VectorIndex::new(self.embedder.clone(), self.store.clone(), collection.clone());

        let built: Result<IndexHandle> = async {
            index.clear().await?;
            index.create().await?;
            match self.config.strategy {
                RetrievalStrategy::ParentChild => self.build_parent_child(&index, documents).await,
                RetrievalStrategy::Standard => self.build_standard(&index, documents).await,
            }
        }
        .await;

        match built {
            Ok(handle) => {
                let report = &handle.report;
                info!(
                    collection = %report.collection,
                    strategy = %report.strategy,
                    source_documents = report.source_documents,
                    parent_count = report.parents,
                    child_count = report.indexed_chunks,
                    "ingestion complete"
                );
                Ok(handle)
            }
            Err(e) => {
                error!(collection = %collection, error = %e, "ingestion failed");
                if let Err(cleanup) = index.clear().await {
                    warn!(collection = %collection, error = %cleanup, "could not drop partial collection");
                }
                Err(RagError::Ingestion { message: format!("collection '{collection}': {e}") })
            }
        }
    }

    async fn build_parent_child(&self, index: &VectorIndex, documents: &[Document]) -> Result<IndexHandle> {
        let corpus = ParentChildSplitter::from_config(&self.config).split(documents);

        let parents = InMemoryDocStore::new();
        for parent in &corpus.parents {
            parents.put(&parent.parent_id, parent.document.clone()).await?;
        }
        let parent_count = corpus.parents.len();
        let indexed_chunks = index.add(indexable(corpus.children)).await?;

        let report = IngestionReport {
            collection: index.collection().to_string(),
            strategy: RetrievalStrategy::ParentChild,
            source_documents: documents.len(),
            parents: parent_count,
            indexed_chunks,
        };
        let retriever = ParentChildRetriever::new(index.clone(), Arc::new(parents), self.config.top_k);
        Ok(IndexHandle { retriever: Arc::new(retriever), report })
    }

    async fn build_standard(&self, index: &VectorIndex, documents: &[Document]) -> Result<IndexHandle> {
        let splitter = ParentChildSplitter::from_config(&self.config);
        let mut chunks = Vec::new();
        for (doc_index, document) in documents.iter().enumerate() {
            for (chunk_index, chunk) in splitter.parent_chunker().chunk(document).into_iter().enumerate() {
                let id = format!("chunk-{doc_index}-{chunk_index}");
                chunks.push(ChildRecord {
                    parent_id: id.clone(),
                    document: chunk,
                    id,
                    embedding: Vec::new(),
                });
            }
        }
        let indexed_chunks = index.add(indexable(chunks)).await?;

        let report = IngestionReport {
            collection: index.collection().to_string(),
            strategy: RetrievalStrategy::Standard,
            source_documents: documents.len(),
            parents: 0,
            indexed_chunks,
        };
        let retriever = StandardRetriever::new(index.clone(), self.config.top_k);
        Ok(IndexHandle { retriever: Arc::new(retriever), report })
    }
}
