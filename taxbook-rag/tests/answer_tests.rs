//! End-to-end answering over an in-memory knowledge base.

mod common;

use std::sync::Arc;

use common::{HashEmbedder, ScriptedGenerator, ScriptedScorer, handbook, ids_in_prompt, verdicts_json};
use taxbook_rag::{
    AnswerEngine, AnswerMode, Assistant, InMemoryVectorStore, Ingestor, KnowledgeBase,
    LlmRelevanceReranker, NO_ANSWER, OutputFormat, RagConfig, RagError, SimilarityReranker,
};

const MODES: [AnswerMode; 3] = [AnswerMode::Standard, AnswerMode::RerankSimilarity, AnswerMode::RerankGeneration];

fn assistant(generator: Arc<ScriptedGenerator>, scorer: Arc<ScriptedScorer>) -> Assistant {
    let ingestor =
        Ingestor::new(RagConfig::default(), Arc::new(HashEmbedder::new()), Arc::new(InMemoryVectorStore::new()));
    let engine = AnswerEngine::builder()
        .generator(generator.clone())
        .similarity_reranker(Arc::new(SimilarityReranker::new(scorer)))
        .generation_reranker(Arc::new(LlmRelevanceReranker::new(generator)))
        .build()
        .unwrap();
    Assistant::new(Arc::new(KnowledgeBase::new(ingestor)), Arc::new(engine))
}

#[tokio::test]
async fn empty_corpus_answers_no_answer_in_every_mode() {
    let generator = ScriptedGenerator::agreeable("should not be used");
    let scorer = ScriptedScorer::new(&[1.0, 1.0, 1.0]);
    let assistant = assistant(generator.clone(), scorer.clone());
    assistant.knowledge().reindex(&[]).await.unwrap();

    for mode in MODES {
        let answer = assistant.answer("Wie hoch ist der Pauschalabzug?", mode).await.unwrap();
        assert_eq!(answer, NO_ANSWER, "mode {mode}");
    }
    assert_eq!(generator.calls(), 0);
    assert_eq!(scorer.calls(), 0);
}

#[tokio::test]
async fn standard_mode_answers_from_every_retrieved_parent() {
    let generator = ScriptedGenerator::agreeable("Die Fahrkosten sind abziehbar.");
    let assistant = assistant(generator.clone(), ScriptedScorer::new(&[]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    let answer = assistant.answer("Fahrkosten?", AnswerMode::Standard).await.unwrap();

    assert_eq!(answer, "Die Fahrkosten sind abziehbar.");
    assert_eq!(generator.calls(), 1);
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Question: Fahrkosten?"));
    for page in handbook() {
        assert!(prompt.contains(&page.content));
    }
}

#[tokio::test]
async fn generation_rerank_limits_the_context_to_relevant_parents() {
    let generator = ScriptedGenerator::new(|request| match request.format {
        OutputFormat::Json => Ok(verdicts_json(&ids_in_prompt(&request.prompt), |i| i == 0)),
        OutputFormat::Text => Ok("Der Eigenmietwert ist steuerbar.".to_string()),
    });
    let assistant = assistant(generator.clone(), ScriptedScorer::new(&[]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    let answer = assistant.answer("Eigenmietwert", AnswerMode::RerankGeneration).await.unwrap();

    assert_eq!(answer, "Der Eigenmietwert ist steuerbar.");
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Eigenmietwert wird als Einkommen besteuert"));
    assert!(!prompts[1].contains("Säule 3a"));
    assert!(!prompts[1].contains("Berufsauslagen"));
}

#[tokio::test]
async fn everything_rejected_skips_the_answer_model() {
    let generator = ScriptedGenerator::new(|request| match request.format {
        OutputFormat::Json => Ok(verdicts_json(&ids_in_prompt(&request.prompt), |_| false)),
        OutputFormat::Text => Ok("invented".to_string()),
    });
    let assistant = assistant(generator.clone(), ScriptedScorer::new(&[]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    let answer = assistant.answer("Hundesteuer?", AnswerMode::RerankGeneration).await.unwrap();

    assert_eq!(answer, NO_ANSWER);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn similarity_rerank_drops_low_scores() {
    let generator = ScriptedGenerator::agreeable("ok");
    let assistant = assistant(generator.clone(), ScriptedScorer::new(&[0.9, 0.1, 0.1]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    assistant.answer("Eigenmietwert Liegenschaft", AnswerMode::RerankSimilarity).await.unwrap();

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Eigenmietwert wird als Einkommen besteuert"));
    assert!(!prompt.contains("Säule 3a"));
}

#[tokio::test]
async fn malformed_verdicts_surface_as_rerank_parse() {
    let generator = ScriptedGenerator::new(|_| Ok("[{\"id\": 1}]".to_string()));
    let assistant = assistant(generator, ScriptedScorer::new(&[]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    let err = assistant.answer("frage", AnswerMode::RerankGeneration).await.unwrap_err();
    assert!(matches!(err, RagError::RerankParse { .. }), "got {err:?}");
}

#[tokio::test]
async fn generation_failure_is_reported() {
    let generator = ScriptedGenerator::failing();
    let assistant = assistant(generator, ScriptedScorer::new(&[]));
    assistant.knowledge().reindex(&handbook()).await.unwrap();

    let err = assistant.answer("frage", AnswerMode::Standard).await.unwrap_err();
    assert!(matches!(err, RagError::Generation { .. }), "got {err:?}");
}

#[tokio::test]
async fn unconfigured_mode_is_a_config_error() {
    let generator = ScriptedGenerator::agreeable("ok");
    let engine = AnswerEngine::builder().generator(generator.clone()).build().unwrap();
    let kb = KnowledgeBase::new(Ingestor::new(
        RagConfig::default(),
        Arc::new(HashEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
    ));

    assert!(engine.supports(AnswerMode::Standard));
    assert!(!engine.supports(AnswerMode::RerankSimilarity));
    let err = engine.answer(&kb, "frage", AnswerMode::RerankGeneration).await.unwrap_err();
    assert!(matches!(err, RagError::Config(_)), "got {err:?}");
    assert_eq!(generator.calls(), 0);
}

#[test]
fn engine_requires_a_generator() {
    assert!(matches!(AnswerEngine::builder().build(), Err(RagError::Config(_))));
}
