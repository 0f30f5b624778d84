//! Deterministic stand-ins for the hosted capabilities.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use taxbook_rag::classifier::START_MARKER;
use taxbook_rag::{
    ChildRecord, Document, EmbeddingProvider, GenerationRequest, Generator, OutputFormat, RagError,
    RelevanceScore, RelevanceScorer, Result, SearchHit, VectorStore,
};

pub const DIM: usize = 1024;

/// Bag-of-words embedder: every lowercased word hashes into one of `DIM` buckets.
///
/// Any text containing `poison` fails to embed. With `reject_blank` set,
/// whitespace-only input fails the way hosted embedding APIs reject it.
#[derive(Debug, Default)]
pub struct HashEmbedder {
    pub poison: Option<String>,
    pub reject_blank: bool,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poisoned(marker: &str) -> Self {
        Self { poison: Some(marker.to_string()), ..Self::default() }
    }

    pub fn rejecting_blank() -> Self {
        Self { reject_blank: true, ..Self::default() }
    }
}

fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIM as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.reject_blank && text.trim().is_empty() {
            return Err(RagError::Embedding {
                provider: "hash".into(),
                message: "'$.input' is invalid".into(),
            });
        }
        if let Some(marker) = &self.poison {
            if text.contains(marker.as_str()) {
                return Err(RagError::Embedding {
                    provider: "hash".into(),
                    message: "poisoned input".into(),
                });
            }
        }
        let mut vector = vec![0.0; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// A vector store that ignores the query and answers with preset hits.
pub struct FixedHitsStore {
    pub hits: Vec<SearchHit>,
}

impl FixedHitsStore {
    /// Hits for `(child_id, parent_id, score)` triples, in the given order.
    pub fn new(hits: &[(&str, &str, f32)]) -> Self {
        let hits = hits
            .iter()
            .map(|&(id, parent_id, score)| SearchHit {
                child: ChildRecord {
                    id: id.to_string(),
                    parent_id: parent_id.to_string(),
                    document: Document::new(format!("child {id}")),
                    embedding: vec![1.0],
                },
                score,
            })
            .collect();
        Self { hits }
    }
}

#[async_trait]
impl VectorStore for FixedHitsStore {
    fn backend(&self) -> &str {
        "fixed"
    }

    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _collection: &str, _children: &[ChildRecord]) -> Result<()> {
        Ok(())
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Ok(self.hits.len())
    }

    async fn search(&self, _collection: &str, _embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

type Script = dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync;

/// A generator answering from a closure and recording every request.
pub struct ScriptedGenerator {
    script: Box<Script>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(script: impl Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { script: Box::new(script), requests: Mutex::new(Vec::new()) })
    }

    /// Marks every candidate relevant and answers text prompts with `answer`.
    pub fn agreeable(answer: &'static str) -> Arc<Self> {
        Self::new(move |request| match request.format {
            OutputFormat::Json => Ok(verdicts_json(&ids_in_prompt(&request.prompt), |_| true)),
            OutputFormat::Text => Ok(answer.to_string()),
        })
    }

    /// Fails every request.
    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(RagError::Generation { message: "model unavailable".into() }))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.prompt.clone()).collect()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(&request)
    }
}

/// Identifiers tagged onto candidates in a classification prompt, in order.
pub fn ids_in_prompt(prompt: &str) -> Vec<String> {
    prompt
        .split(START_MARKER)
        .skip(1)
        .filter_map(|rest| rest.split_whitespace().next().filter(|_| !rest.starts_with(' ')))
        .map(str::to_string)
        .collect()
}

/// A verdict object for `ids`, deciding relevance with `relevant`.
pub fn verdicts_json(ids: &[String], relevant: impl Fn(usize) -> bool) -> String {
    let verdicts: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| serde_json::json!({ "id": id, "relevant": relevant(i) }))
        .collect();
    serde_json::json!({ "verdicts": verdicts }).to_string()
}

/// A scorer returning preset relevance scores and counting calls.
pub struct ScriptedScorer {
    pub scores: Vec<f32>,
    pub calls: Mutex<usize>,
}

impl ScriptedScorer {
    pub fn new(scores: &[f32]) -> Arc<Self> {
        Arc::new(Self { scores: scores.to_vec(), calls: Mutex::new(0) })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RelevanceScorer for ScriptedScorer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn score(&self, _query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        *self.calls.lock().unwrap() += 1;
        Ok(documents
            .iter()
            .enumerate()
            .map(|(index, _)| RelevanceScore {
                index,
                relevance_score: self.scores.get(index).copied().unwrap_or(0.0),
            })
            .collect())
    }
}

/// Handbook pages used across tests.
pub fn handbook() -> Vec<Document> {
    vec![
        Document::page_of(
            "Der Eigenmietwert wird als Einkommen besteuert. Unterhaltskosten der Liegenschaft sind abziehbar.",
            "wegleitung.txt",
            0,
        ),
        Document::page_of(
            "Berufsauslagen: Fahrkosten zum Arbeitsort und Verpflegung sind als Pauschale abziehbar.",
            "wegleitung.txt",
            1,
        ),
        Document::page_of(
            "Säule 3a: Beiträge an die gebundene Vorsorge können bis zum Maximalbetrag abgezogen werden.",
            "vorsorge.txt",
            0,
        ),
    ]
}
