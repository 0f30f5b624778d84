//! Reranking by generation-model relevance classification.
//!
//! Every candidate is tagged with a fresh random identifier, all of them
//! are embedded in one prompt, and the model answers with one verdict per
//! identifier. Candidates without a positive verdict are dropped, and the
//! survivors keep their retrieval order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::document::{Document, keys};
use crate::error::{RagError, Result};
use crate::generation::{GenerationRequest, Generator};
use crate::reranker::{RerankVerdict, Reranker};

/// Marker opening a candidate in the classification prompt.
pub const START_MARKER: &str = "===START===";
/// Marker closing a candidate in the classification prompt.
pub const END_MARKER: &str = "===END===";

/// Turns raw model output into verdicts.
///
/// Implementations must reject anything that does not match their schema
/// with [`RagError::RerankParse`] instead of guessing.
pub trait VerdictParser: Send + Sync {
    /// Prompt text describing the output format the parser accepts.
    fn format_instructions(&self) -> &str;

    /// Parse the model's raw output.
    fn parse(&self, raw: &str) -> Result<Vec<RerankVerdict>>;
}

const JSON_FORMAT_INSTRUCTIONS: &str = r#"Respond with a single JSON object and nothing else, in exactly this shape:
{"verdicts": [{"id": "<identifier>", "relevant": true}, {"id": "<identifier>", "relevant": false}]}
Include one entry for every document. "id" is the identifier written right after the start marker. "relevant" is true when the document helps answer the question and false otherwise."#;

/// Strict JSON verdict parser.
///
/// Accepts `{"verdicts": [{"id": .., "relevant": ..}, ..]}` or a bare array
/// of the same objects, optionally wrapped in a markdown code fence.
/// Unknown fields, missing fields and wrong types are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVerdictParser;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VerdictWire {
    id: String,
    relevant: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VerdictListWire {
    verdicts: Vec<VerdictWire>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VerdictPayload {
    Object(VerdictListWire),
    List(Vec<VerdictWire>),
}

/// Remove a surrounding markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

impl VerdictParser for JsonVerdictParser {
    fn format_instructions(&self) -> &str {
        JSON_FORMAT_INSTRUCTIONS
    }

    fn parse(&self, raw: &str) -> Result<Vec<RerankVerdict>> {
        let payload: VerdictPayload = serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
            RagError::RerankParse { message: format!("output is not a verdict list: {e}") }
        })?;
        let verdicts = match payload {
            VerdictPayload::Object(list) => list.verdicts,
            VerdictPayload::List(list) => list,
        };
        Ok(verdicts
            .into_iter()
            .map(|wire| RerankVerdict { identifier: wire.id, relevant: wire.relevant })
            .collect())
    }
}

/// Classifies candidates with a generation model and keeps the relevant ones.
///
/// Fail-closed: a candidate the model does not mention is dropped, and a
/// candidate mentioned more than once survives only if every verdict says
/// relevant. Output the parser rejects fails the whole rerank.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::LlmRelevanceReranker;
///
/// let reranker = LlmRelevanceReranker::new(generator);
/// let relevant = reranker.rerank("Was gilt für Eigenleistungen?", &candidates).await?;
/// ```
pub struct LlmRelevanceReranker {
    generator: Arc<dyn Generator>,
    parser: Arc<dyn VerdictParser>,
}

impl LlmRelevanceReranker {
    /// Create a reranker using `generator` and the [`JsonVerdictParser`].
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator, parser: Arc::new(JsonVerdictParser) }
    }

    /// Replace the verdict parser.
    pub fn with_parser(mut self, parser: Arc<dyn VerdictParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Build the classification prompt for identifier-tagged candidates.
    pub fn build_prompt(&self, question: &str, tagged: &[(String, &Document)]) -> String {
        let documents = tagged
            .iter()
            .map(|(id, doc)| format!("{START_MARKER}{id}  {} {END_MARKER}", doc.content))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Question: {question}\n\n\
             Documents:\n{documents}\n\n\
             Task: Judge how relevant each of the documents above is to the question. \
             Consider whether the document answers the question, whether it contains \
             relevant information, and whether that information appears correct and \
             trustworthy. Each document is enclosed between {START_MARKER} and {END_MARKER}. \
             The identifier of a document follows {START_MARKER} directly, the document \
             content follows the identifier.\n\n{}",
            self.parser.format_instructions()
        )
    }
}

/// Fold verdicts into one decision per known identifier.
fn decide(verdicts: Vec<RerankVerdict>, known: &[(String, &Document)]) -> HashMap<String, bool> {
    let mut decisions: HashMap<String, bool> = HashMap::new();
    for verdict in verdicts {
        if !known.iter().any(|(id, _)| *id == verdict.identifier) {
            warn!(identifier = %verdict.identifier, "verdict for unknown identifier ignored");
            continue;
        }
        match decisions.get_mut(&verdict.identifier) {
            Some(relevant) => {
                warn!(identifier = %verdict.identifier, "duplicate verdict");
                *relevant = *relevant && verdict.relevant;
            }
            None => {
                decisions.insert(verdict.identifier, verdict.relevant);
            }
        }
    }
    decisions
}

#[async_trait]
impl Reranker for LlmRelevanceReranker {
    fn name(&self) -> &str {
        "llm-relevance"
    }

    async fn rerank(&self, question: &str, candidates: &[Document]) -> Result<Vec<Document>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let tagged: Vec<(String, &Document)> =
            candidates.iter().map(|doc| (Uuid::new_v4().to_string(), doc)).collect();
        let prompt = self.build_prompt(question, &tagged);

        let raw = self.generator.generate(GenerationRequest::json(prompt)).await.map_err(|e| {
            error!(model = self.generator.name(), error = %e, "relevance classification failed");
            RagError::Reranker { reranker: self.name().to_string(), message: e.to_string() }
        })?;

        let verdicts = self.parser.parse(&raw).map_err(|e| {
            error!(error = %e, "relevance verdicts could not be parsed");
            e
        })?;
        let decisions = decide(verdicts, &tagged);

        let kept: Vec<Document> = tagged
            .into_iter()
            .filter_map(|(id, doc)| {
                let relevant = decisions.get(&id).copied().unwrap_or(false);
                debug!(document = %doc.label(), relevant, "relevance verdict");
                relevant.then(|| doc.clone().with_metadata(keys::UUID, id))
            })
            .collect();

        info!(before = candidates.len(), after = kept.len(), "llm relevance rerank");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_and_bare_array() {
        let parser = JsonVerdictParser;
        let object = parser.parse(r#"{"verdicts":[{"id":"a","relevant":true}]}"#).unwrap();
        let array = parser.parse(r#"[{"id":"a","relevant":true}]"#).unwrap();
        assert_eq!(object, array);
        assert_eq!(object[0], RerankVerdict { identifier: "a".into(), relevant: true });
    }

    #[test]
    fn strips_markdown_fence() {
        let raw = "```json\n{\"verdicts\":[{\"id\":\"x\",\"relevant\":false}]}\n```";
        let verdicts = JsonVerdictParser.parse(raw).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert!(!verdicts[0].relevant);
    }

    #[test]
    fn rejects_malformed_output() {
        for raw in [
            "all documents are relevant",
            r#"{"verdicts":[{"id":"a"}]}"#,
            r#"{"verdicts":[{"id":"a","relevant":"yes"}]}"#,
            r#"{"verdicts":[{"id":"a","relevant":true,"why":"x"}]}"#,
            r#"{"results":[]}"#,
        ] {
            let err = JsonVerdictParser.parse(raw).unwrap_err();
            assert!(matches!(err, RagError::RerankParse { .. }), "accepted: {raw}");
        }
    }

    #[test]
    fn duplicate_verdicts_must_all_agree() {
        let doc = Document::new("d");
        let known = vec![("a".to_string(), &doc), ("b".to_string(), &doc)];
        let verdicts = vec![
            RerankVerdict { identifier: "a".into(), relevant: true },
            RerankVerdict { identifier: "a".into(), relevant: false },
            RerankVerdict { identifier: "b".into(), relevant: true },
            RerankVerdict { identifier: "zzz".into(), relevant: true },
        ];
        let decisions = decide(verdicts, &known);
        assert_eq!(decisions.get("a"), Some(&false));
        assert_eq!(decisions.get("b"), Some(&true));
        assert!(!decisions.contains_key("zzz"));
    }
}
