//! Vector index over child chunks: an embedding provider bound to one
//! collection of a [`VectorStore`].

use std::sync::Arc;

use tracing::debug;

use crate::document::{ChildRecord, SearchHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Number of texts sent to the embedding provider per request.
const EMBED_BATCH_SIZE: usize = 100;

/// Child-chunk index bound to a single collection.
///
/// Cloning is cheap and yields a handle to the same collection.
#[derive(Clone)]
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl VectorIndex {
    /// Bind `embedder` and `store` to `collection`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self { embedder, store, collection: collection.into() }
    }

    /// Name of the bound collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection with the embedder's dimensionality.
    pub async fn create(&self) -> Result<()> {
        self.store.create_collection(&self.collection, self.embedder.dimensions()).await
    }

    /// Embed and insert children, returning how many were stored.
    pub async fn add(&self, mut children: Vec<ChildRecord>) -> Result<usize> {
        for batch in children.chunks_mut(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.document.content.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding {
                    provider: self.embedder.name().to_string(),
                    message: format!(
                        "expected {} embeddings, received {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            for (child, embedding) in batch.iter_mut().zip(embeddings) {
                child.embedding = embedding;
            }
            self.store.upsert(&self.collection, batch).await?;
            debug!(collection = %self.collection, batch_size = batch.len(), "indexed child batch");
        }
        Ok(children.len())
    }

    /// Up to `k` children most similar to `query`, by descending score.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        self.store.search(&self.collection, &embedding, k).await
    }

    /// Number of indexed children.
    pub async fn len(&self) -> Result<usize> {
        self.store.count(&self.collection).await
    }

    /// Drop the collection. Succeeds when it does not exist.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete_collection(&self.collection).await
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.name())
            .field("store", &self.store.backend())
            .field("collection", &self.collection)
            .finish()
    }
}
