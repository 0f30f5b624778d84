//! Vector similarity search capability over child records.

use async_trait::async_trait;

use crate::document::{ChildRecord, SearchHit};
use crate::error::Result;

/// A storage backend for child embeddings with similarity search.
///
/// Implementations manage named collections of [`ChildRecord`]s. Deleting a
/// collection that does not exist must succeed, since a first ingestion run
/// always starts by clearing its target.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("taxbook", 1536).await?;
/// store.upsert("taxbook", &children).await?;
/// let hits = store.search("taxbook", &query_embedding, 30).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert children into a collection. Children must have embeddings set.
    async fn upsert(&self, collection: &str, children: &[ChildRecord]) -> Result<()>;

    /// Number of children stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Search for the `top_k` most similar children to the given embedding.
    ///
    /// Returns hits ordered by descending similarity score; fewer than
    /// `top_k` when the collection is smaller.
    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;
}
