//! Environment-driven server configuration.

use std::path::PathBuf;

use taxbook_rag::{RagConfig, RagError, Result, RetrievalStrategy};

/// Everything the server needs to build its pipeline and bind.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CSV manifest listing the handbook files.
    pub manifest: PathBuf,
    pub rag: RagConfig,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_embedding_model: String,
    /// Enables the `rerank-similarity` mode when set.
    pub cohere_api_key: Option<String>,
    pub cohere_model: String,
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| RagError::Config(format!("{key} must be set")))
        };

        let port = match get("TAXBOOK_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|e| RagError::Config(format!("TAXBOOK_PORT '{value}': {e}")))?,
            None => 5000,
        };

        let mut rag = RagConfig::builder();
        if let Some(collection) = get("TAXBOOK_COLLECTION") {
            rag = rag.collection(collection);
        }
        if let Some(strategy) = get("TAXBOOK_STRATEGY") {
            rag = rag.strategy(strategy.parse::<RetrievalStrategy>()?);
        }
        if let Some(top_k) = get("TAXBOOK_TOP_K") {
            let top_k = top_k
                .parse::<usize>()
                .map_err(|e| RagError::Config(format!("TAXBOOK_TOP_K '{top_k}': {e}")))?;
            rag = rag.top_k(top_k);
        }

        Ok(Self {
            host: get("TAXBOOK_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            manifest: PathBuf::from(required("TAXBOOK_MANIFEST")?),
            rag: rag.build()?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            cohere_api_key: get("COHERE_API_KEY"),
            cohere_model: get("COHERE_RERANK_MODEL")
                .unwrap_or_else(|| "rerank-multilingual-v3.0".to_string()),
        })
    }
}
