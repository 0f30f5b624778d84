//! The currently served index and its re-ingestion.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::ingest::{IngestionReport, Ingestor};
use crate::retriever::{EmptyRetriever, Retriever};
use crate::source::DocumentSource;

/// Holds the retriever that queries are served from and swaps it on
/// re-ingestion.
///
/// Re-ingestions are serialized. A new index is built completely before
/// it replaces the old one; the old collection is dropped only after the
/// swap, once no retrieval is still reading it. Until the first ingestion
/// finishes, queries see an empty index.
pub struct KnowledgeBase {
    ingestor: Ingestor,
    current: RwLock<Arc<dyn Retriever>>,
    ingest_lock: Mutex<()>,
}

impl KnowledgeBase {
    /// Create a knowledge base that serves nothing until [`reindex`](Self::reindex) runs.
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            current: RwLock::new(Arc::new(EmptyRetriever)),
            ingest_lock: Mutex::new(()),
        }
    }

    /// Return a reference to the ingestor.
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Rebuild the index from `documents` and swap it in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] if the build fails; the previously
    /// served index keeps serving.
    pub async fn reindex(&self, documents: &[Document]) -> Result<IngestionReport> {
        let _guard = self.ingest_lock.lock().await;

        let handle = self.ingestor.ingest(documents).await?;
        let previous = {
            let mut current = self.current.write().await;
            std::mem::replace(&mut *current, handle.retriever)
        };

        if let Err(e) = previous.retire().await {
            warn!(error = %e, "could not drop the replaced collection");
        }
        info!(collection = %handle.report.collection, "index swapped");
        Ok(handle.report)
    }

    /// Load documents from `source`, then [`reindex`](Self::reindex).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] if the source cannot be read or the
    /// build fails.
    pub async fn reindex_from(&self, source: &dyn DocumentSource) -> Result<IngestionReport> {
        let documents = source.load().await.map_err(|e| RagError::Ingestion { message: e.to_string() })?;
        self.reindex(&documents).await
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let current = self.current.read().await;
        current.retrieve(query).await
    }
}
