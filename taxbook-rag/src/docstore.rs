//! Parent store: parent id → full parent document.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Document, ParentRecord};
use crate::error::{RagError, Result};

/// Key-value storage for parent chunks.
///
/// Written once by ingestion, then read concurrently by queries. Records
/// are never updated in place; re-ingestion builds a fresh store.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Store a parent document under `parent_id`.
    ///
    /// Fails if the id is already present.
    async fn put(&self, parent_id: &str, document: Document) -> Result<()>;

    /// Look up a parent by id.
    ///
    /// Returns [`RagError::ParentNotFound`] for unknown ids.
    async fn get(&self, parent_id: &str) -> Result<ParentRecord>;

    /// All stored parent ids in insertion order.
    async fn list_ids(&self) -> Result<Vec<String>>;
}

/// A [`DocStore`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDocStore {
    inner: RwLock<Records>,
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<String, ParentRecord>,
    order: Vec<String>,
}

impl InMemoryDocStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored parents.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// Whether the store holds no parents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocStore for InMemoryDocStore {
    async fn put(&self, parent_id: &str, document: Document) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(parent_id) {
            return Err(RagError::Ingestion {
                message: format!("parent id '{parent_id}' stored twice"),
            });
        }
        inner.order.push(parent_id.to_string());
        inner
            .by_id
            .insert(parent_id.to_string(), ParentRecord { parent_id: parent_id.to_string(), document });
        Ok(())
    }

    async fn get(&self, parent_id: &str) -> Result<ParentRecord> {
        let inner = self.inner.read().await;
        inner.by_id.get(parent_id).cloned().ok_or_else(|| RagError::ParentNotFound(parent_id.to_string()))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.order.clone())
    }
}
