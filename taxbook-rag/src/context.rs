//! Prompt assembly and grounded answer generation.

use std::sync::Arc;

use tracing::{error, info};

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::generation::{GenerationRequest, Generator};

/// Answer returned when no context survived retrieval and reranking.
pub const NO_ANSWER: &str =
    "I don't know. The tax handbook excerpts available to me contain no information on this question.";

/// Join document contents with a blank line, in the order given.
pub fn format_context(documents: &[Document]) -> String {
    documents.iter().map(|doc| doc.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Build the answer prompt for `question` from `documents`.
pub fn assemble(documents: &[Document], question: &str) -> String {
    let context = format_context(documents);
    format!(
        "You are a helpful assistant answering questions about the tax handbook in a polite tone. \
         Summarize precisely and in clear words. Use a bulleted list, but only where it helps. \
         Use the following context to answer the question at the end. Only answer if the \
         context contains the facts for it. Do not use your own knowledge; if the context is \
         not sufficient, say that you do not know. Under no circumstances make up an answer. \
         You may format the answer with light Markdown.\n\n\
         Context: {context}\n\n\
         Question: {question}\n\n\
         Helpful answer:"
    )
}

/// Final pipeline stage: prompt assembly plus one generation call.
///
/// Runs the model at a fixed temperature and returns its text unmodified.
/// An empty context short-circuits to [`NO_ANSWER`] without calling the model.
#[derive(Clone)]
pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
    temperature: f32,
}

impl AnswerGenerator {
    /// Create a stage using `generator` at temperature 0.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator, temperature: 0.0 }
    }

    /// Override the generation temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `question` from `documents`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the model call fails.
    pub async fn answer(&self, question: &str, documents: &[Document]) -> Result<String> {
        if documents.is_empty() {
            info!("no context for question, answering without the model");
            return Ok(NO_ANSWER.to_string());
        }

        let prompt = assemble(documents, question);
        let request = GenerationRequest::text(prompt).with_temperature(self.temperature);
        let answer = self.generator.generate(request).await.map_err(|e| {
            error!(model = self.generator.name(), error = %e, "answer generation failed");
            match e {
                RagError::Generation { .. } => e,
                other => RagError::Generation { message: other.to_string() },
            }
        })?;

        info!(model = self.generator.name(), context_documents = documents.len(), "answer generated");
        Ok(answer)
    }
}
