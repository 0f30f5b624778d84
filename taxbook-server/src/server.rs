use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use taxbook_rag::{
    AnswerEngine, AnswerMode, Assistant, DocumentSource, InMemoryVectorStore, IngestionReport,
    Ingestor, KnowledgeBase, LlmRelevanceReranker, ManifestSource, SimilarityReranker,
    cohere::CohereScorer,
    openai::{OpenAIEmbeddingProvider, OpenAIGenerator},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{config::ServerConfig, error::ApiError};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Assistant,
    /// Where `/rest/reindex` reloads the handbook from.
    pub source: Arc<dyn DocumentSource>,
}

impl AppState {
    pub fn new(assistant: Assistant, source: Arc<dyn DocumentSource>) -> Self {
        Self { assistant, source }
    }
}

#[derive(Debug, Deserialize)]
pub struct TextAnalyticsRequest {
    pub question: String,
    #[serde(default)]
    pub mode: AnswerMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextAnalyticsResponse {
    pub llm_response: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/rest/text-analytics", post(text_analytics))
        .route("/rest/reindex", post(reindex))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Wire the hosted capabilities from `config` and run the initial ingestion.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let embedder = OpenAIEmbeddingProvider::new(config.openai_api_key.clone())?
        .with_model(config.openai_embedding_model.clone());
    let generator = Arc::new(
        OpenAIGenerator::new(config.openai_api_key.clone())?.with_model(config.openai_model.clone()),
    );

    let mut engine = AnswerEngine::builder()
        .generator(generator.clone())
        .temperature(config.rag.temperature)
        .generation_reranker(Arc::new(LlmRelevanceReranker::new(generator)));
    match &config.cohere_api_key {
        Some(key) => {
            let scorer = CohereScorer::new(key.clone())?.with_model(config.cohere_model.clone());
            engine = engine.similarity_reranker(Arc::new(
                SimilarityReranker::new(Arc::new(scorer)).with_threshold(config.rag.rerank_threshold),
            ));
        }
        None => warn!("COHERE_API_KEY not set, rerank-similarity mode is disabled"),
    }

    let ingestor = Ingestor::new(config.rag.clone(), Arc::new(embedder), Arc::new(InMemoryVectorStore::new()));
    let knowledge = Arc::new(KnowledgeBase::new(ingestor));
    let source: Arc<dyn DocumentSource> = Arc::new(ManifestSource::new(&config.manifest));

    let report = knowledge
        .reindex_from(source.as_ref())
        .await
        .with_context(|| format!("initial ingestion of {}", config.manifest.display()))?;
    info!(
        collection = %report.collection,
        parent_count = report.parents,
        child_count = report.indexed_chunks,
        "handbook indexed"
    );

    Ok(AppState::new(Assistant::new(knowledge, Arc::new(engine.build()?)), source))
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for taxbook server")?;
    let state = build_state(&config).await?;
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("taxbook-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn text_analytics(
    State(state): State<AppState>,
    Json(request): Json<TextAnalyticsRequest>,
) -> Result<Json<TextAnalyticsResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let llm_response = state.assistant.answer(question, request.mode).await?;
    Ok(Json(TextAnalyticsResponse { llm_response }))
}

async fn reindex(State(state): State<AppState>) -> Result<Json<IngestionReport>, ApiError> {
    let report = state.assistant.knowledge().reindex_from(state.source.as_ref()).await?;
    Ok(Json(report))
}
