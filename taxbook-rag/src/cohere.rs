//! Cohere rerank scorer.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::similarity::{RelevanceScore, RelevanceScorer};

/// The default Cohere API base URL.
pub const COHERE_API_BASE: &str = "https://api.cohere.com/v1";

/// The default multilingual rerank model.
const DEFAULT_RERANK_MODEL: &str = "rerank-multilingual-v3.0";

/// A [`RelevanceScorer`] backed by the Cohere `/rerank` endpoint.
///
/// Every submitted document is scored (`top_n` equals the number of
/// documents) and the documents are not echoed back.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::cohere::CohereScorer;
///
/// let scorer = CohereScorer::from_env()?.with_model("rerank-multilingual-v3.0");
/// ```
pub struct CohereScorer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

fn rerank_error(message: String) -> RagError {
    RagError::Reranker { reranker: "Cohere".into(), message }
}

impl CohereScorer {
    /// Create a new scorer with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("Cohere API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: COHERE_API_BASE.into(),
            model: DEFAULT_RERANK_MODEL.into(),
        })
    }

    /// Create a new scorer using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| RagError::Config("COHERE_API_KEY environment variable not set".into()))?;
        Self::new(api_key)
    }

    /// Set the rerank model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the scorer at a Cohere-compatible API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
    return_documents: bool,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RelevanceScore>,
}

#[async_trait]
impl RelevanceScorer for CohereScorer {
    fn name(&self) -> &str {
        "Cohere"
    }

    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, documents = documents.len(), "cohere rerank");

        let body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
            return_documents: false,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "cohere request failed");
                rerank_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(%status, "cohere API error");
            return Err(rerank_error(format!("API returned {status}: {text}")));
        }

        let parsed: RerankResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse cohere response");
            rerank_error(format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.results)
    }
}
