//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `Vec` behind a
//! `tokio::sync::RwLock`. Insertion order is preserved, so hits with equal
//! scores come back in the order they were ingested.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{ChildRecord, SearchHit};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Collections map a name to its children in insertion order. Upserting a
/// child whose id already exists replaces it in place.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("taxbook", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<ChildRecord>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all collections currently held.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStore {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.remove(name).is_none() {
            debug!(collection = name, "collection to delete does not exist");
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, children: &[ChildRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for child in children {
            if child.embedding.is_empty() {
                return Err(RagError::VectorStore {
                    backend: BACKEND.to_string(),
                    message: format!("child '{}' has no embedding", child.id),
                });
            }
            match store.iter_mut().find(|existing| existing.id == child.id) {
                Some(existing) => *existing = child.clone(),
                None => store.push(child.clone()),
            }
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(Vec::len).ok_or_else(|| missing(collection))
    }

    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut scored: Vec<SearchHit> = store
            .iter()
            .map(|child| SearchHit {
                score: cosine_similarity(&child.embedding, embedding),
                child: child.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn child(id: &str, embedding: Vec<f32>) -> ChildRecord {
        ChildRecord {
            id: id.to_string(),
            parent_id: "p".to_string(),
            document: Document::new(id),
            embedding,
        }
    }

    #[tokio::test]
    async fn deleting_a_missing_collection_is_a_no_op() {
        let store = InMemoryVectorStore::new();
        store.delete_collection("never-created").await.unwrap();
        assert!(store.collection_names().await.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_counts() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[child("a", vec![1.0, 0.0]), child("b", vec![0.0, 1.0])]).await.unwrap();
        store.upsert("c", &[child("a", vec![0.5, 0.5])]).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejects_children_without_embeddings() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let err = store.upsert("c", &[child("a", Vec::new())]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStore { .. }));
    }

    #[tokio::test]
    async fn search_returns_everything_when_top_k_exceeds_size() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[child("a", vec![1.0, 0.0]), child("b", vec![0.0, 1.0])]).await.unwrap();
        let hits = store.search("c", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].child.id, "a");
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
