use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use taxbook_rag::{
    AnswerEngine, Assistant, Document, EmbeddingProvider, GenerationRequest, Generator,
    InMemoryVectorStore, Ingestor, KnowledgeBase, NO_ANSWER, OutputFormat, RagConfig, RagError,
    Result, StaticSource,
};
use taxbook_server::{AppState, app_router, server::TextAnalyticsResponse};

/// One dimension per letter, counting occurrences.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; 26];
        for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            vector[usize::from(c - b'a')] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Answers text prompts with a fixed reply, rejects every candidate in JSON mode.
struct CannedGenerator {
    reply: std::result::Result<String, String>,
    formats: Mutex<Vec<OutputFormat>>,
}

#[async_trait]
impl Generator for CannedGenerator {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.formats.lock().unwrap().push(request.format);
        match (&self.reply, request.format) {
            (Err(message), _) => Err(RagError::Generation { message: message.clone() }),
            (Ok(_), OutputFormat::Json) => Ok(json!({ "verdicts": [] }).to_string()),
            (Ok(reply), OutputFormat::Text) => Ok(reply.clone()),
        }
    }
}

fn handbook() -> Vec<Document> {
    vec![
        Document::page_of("Der Eigenmietwert ist steuerbar.", "wegleitung.txt", 0),
        Document::page_of("Fahrkosten sind abziehbar.", "wegleitung.txt", 1),
    ]
}

async fn spawn_server(reply: std::result::Result<&str, &str>) -> (String, Arc<CannedGenerator>, tokio::task::JoinHandle<()>) {
    let generator = Arc::new(CannedGenerator {
        reply: reply.map(str::to_string).map_err(str::to_string),
        formats: Mutex::new(Vec::new()),
    });
    let ingestor = Ingestor::new(RagConfig::default(), Arc::new(LetterEmbedder), Arc::new(InMemoryVectorStore::new()));
    let knowledge = Arc::new(KnowledgeBase::new(ingestor));
    let source = Arc::new(StaticSource::new(handbook()));
    knowledge.reindex_from(source.as_ref()).await.expect("initial ingestion");

    let engine = AnswerEngine::builder()
        .generator(generator.clone())
        .generation_reranker(Arc::new(taxbook_rag::LlmRelevanceReranker::new(generator.clone())))
        .build()
        .expect("engine");
    let state = AppState::new(Assistant::new(knowledge, Arc::new(engine)), source);
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), generator, handle)
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, _, handle) = spawn_server(Ok("unused")).await;

    let response = reqwest::get(format!("{}/health", base)).await.expect("health response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("health json");
    assert_eq!(body, json!({"status": "ok"}));

    handle.abort();
}

#[tokio::test]
async fn standard_mode_returns_the_generated_answer() {
    let (base, generator, handle) = spawn_server(Ok("Ja, der Eigenmietwert ist steuerbar.")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/text-analytics", base))
        .json(&json!({ "question": "Ist der Eigenmietwert steuerbar?", "mode": "standard" }))
        .send()
        .await
        .expect("analytics response");

    assert!(response.status().is_success());
    let body: TextAnalyticsResponse = response.json().await.expect("analytics json");
    assert_eq!(body.llm_response, "Ja, der Eigenmietwert ist steuerbar.");
    assert_eq!(*generator.formats.lock().unwrap(), vec![OutputFormat::Text]);

    handle.abort();
}

#[tokio::test]
async fn default_mode_classifies_before_answering() {
    let (base, generator, handle) = spawn_server(Ok("unused")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/text-analytics", base))
        .json(&json!({ "question": "Hundesteuer?" }))
        .send()
        .await
        .expect("analytics response");

    let body: TextAnalyticsResponse = response.json().await.expect("analytics json");
    assert_eq!(body.llm_response, NO_ANSWER);
    assert_eq!(*generator.formats.lock().unwrap(), vec![OutputFormat::Json]);

    handle.abort();
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (base, generator, handle) = spawn_server(Ok("unused")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/text-analytics", base))
        .json(&json!({ "question": "   " }))
        .send()
        .await
        .expect("analytics response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].as_str().is_some());
    assert!(generator.formats.lock().unwrap().is_empty());

    handle.abort();
}

#[tokio::test]
async fn unconfigured_mode_is_a_bad_request() {
    let (base, _, handle) = spawn_server(Ok("unused")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/text-analytics", base))
        .json(&json!({ "question": "Fahrkosten?", "mode": "rerank-similarity" }))
        .send()
        .await
        .expect("analytics response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn generation_failure_is_a_bad_gateway() {
    let (base, _, handle) = spawn_server(Err("model unavailable")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/text-analytics", base))
        .json(&json!({ "question": "Fahrkosten?", "mode": "standard" }))
        .send()
        .await
        .expect("analytics response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].as_str().unwrap_or_default().contains("model unavailable"));

    handle.abort();
}

#[tokio::test]
async fn reindex_reports_the_new_collection() {
    let (base, _, handle) = spawn_server(Ok("unused")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rest/reindex", base))
        .send()
        .await
        .expect("reindex response");

    assert!(response.status().is_success());
    let report: Value = response.json().await.expect("report json");
    assert_eq!(report["source_documents"], 2);
    assert_eq!(report["strategy"], "parent-child");
    assert!(report["collection"].as_str().unwrap_or_default().starts_with("taxbook-"));

    handle.abort();
}
