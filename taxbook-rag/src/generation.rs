//! Generation capability: prompt text in, completion text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Shape the completion must take.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Free text.
    #[default]
    Text,
    /// A single JSON object, nothing else.
    Json,
}

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// The complete prompt.
    pub prompt: String,
    /// Sampling temperature; 0.0 is the deterministic end.
    pub temperature: f32,
    /// Required shape of the completion.
    pub format: OutputFormat,
}

impl GenerationRequest {
    /// A free-text request at temperature 0.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: 0.0, format: OutputFormat::Text }
    }

    /// A JSON-object request at temperature 0.
    pub fn json(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: 0.0, format: OutputFormat::Json }
    }

    /// Override the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A language model that completes prompts.
///
/// Implementations report failures as
/// [`RagError::Generation`](crate::RagError::Generation) and never retry.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model name used in logs and errors.
    fn name(&self) -> &str;

    /// Complete `request.prompt`, returning the raw completion text.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
