//! Query-time retrieval: parent-child and standard strategies.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::document::{Document, SearchHit, keys};
use crate::docstore::DocStore;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Turns a question into an ordered list of context documents.
///
/// An empty index yields an empty list, never an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve documents relevant to `query`, most relevant first.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;

    /// Release the backing collection once this retriever is no longer served.
    async fn retire(&self) -> Result<()> {
        Ok(())
    }
}

/// Serves no documents. Used before the first ingestion completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRetriever;

#[async_trait]
impl Retriever for EmptyRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<Document>> {
        Ok(Vec::new())
    }
}

fn search_failed(collection: &str, e: RagError) -> RagError {
    error!(collection, error = %e, "vector search failed");
    RagError::Retrieval { message: format!("search failed in collection '{collection}': {e}") }
}

/// Searches child chunks and answers with their deduplicated parents.
///
/// A parent with several matching children appears once, at the rank of
/// its best child. Its metadata gains `score` (best child score) and, when
/// more than one child matched, `sub_docs` listing every matching child.
pub struct ParentChildRetriever {
    index: VectorIndex,
    parents: Arc<dyn DocStore>,
    top_k: usize,
}

impl ParentChildRetriever {
    /// Create a retriever over `index` whose children resolve through `parents`.
    pub fn new(index: VectorIndex, parents: Arc<dyn DocStore>, top_k: usize) -> Self {
        Self { index, parents, top_k }
    }

    /// The child index searched by this retriever.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Group hits by parent id in first-seen order.
fn group_by_parent(hits: Vec<SearchHit>) -> Vec<(String, Vec<SearchHit>)> {
    let mut groups: Vec<(String, Vec<SearchHit>)> = Vec::new();
    for hit in hits {
        match groups.iter_mut().find(|(parent_id, _)| *parent_id == hit.child.parent_id) {
            Some((_, group)) => group.push(hit),
            None => groups.push((hit.child.parent_id.clone(), vec![hit])),
        }
    }
    groups
}

#[async_trait]
impl Retriever for ParentChildRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let collection = self.index.collection();
        let hits =
            self.index.search(query, self.top_k).await.map_err(|e| search_failed(collection, e))?;
        let hit_count = hits.len();

        let mut documents = Vec::new();
        for (parent_id, group) in group_by_parent(hits) {
            let record = self.parents.get(&parent_id).await.map_err(|e| {
                error!(collection, parent_id = %parent_id, error = %e, "child hit without parent");
                RagError::Retrieval { message: format!("could not resolve parent of child hit: {e}") }
            })?;

            let mut document = record.document;
            let best = group.first().map(|hit| f64::from(hit.score)).unwrap_or_default();
            document.metadata.insert(keys::SCORE.to_string(), best.into());

            if group.len() > 1 {
                let sub_docs: Vec<Value> = group
                    .into_iter()
                    .map(|hit| {
                        hit.child.document.with_metadata(keys::SCORE, f64::from(hit.score)).into()
                    })
                    .collect();
                document.metadata.insert(keys::SUB_DOCS.to_string(), Value::Array(sub_docs));
            }
            documents.push(document);
        }

        info!(collection, hit_count, parent_count = documents.len(), "parent-child retrieval");
        Ok(documents)
    }

    async fn retire(&self) -> Result<()> {
        self.index.clear().await
    }
}

/// Searches document-level chunks directly, without a parent hierarchy.
///
/// Each returned chunk carries its similarity `score`.
pub struct StandardRetriever {
    index: VectorIndex,
    top_k: usize,
}

impl StandardRetriever {
    /// Create a retriever over `index`.
    pub fn new(index: VectorIndex, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

#[async_trait]
impl Retriever for StandardRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let collection = self.index.collection();
        let hits =
            self.index.search(query, self.top_k).await.map_err(|e| search_failed(collection, e))?;

        let documents: Vec<Document> = hits
            .into_iter()
            .map(|hit| hit.child.document.with_metadata(keys::SCORE, f64::from(hit.score)))
            .collect();

        info!(collection, hit_count = documents.len(), "standard retrieval");
        Ok(documents)
    }

    async fn retire(&self) -> Result<()> {
        self.index.clear().await
    }
}
