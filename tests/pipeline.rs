//! End-to-end pipeline tests over the in-memory store and stub clients.
//!
//! These exercise the full ingest → retrieve → prompt → generate flow with
//! the deterministic hash embedder, so every run is repeatable with no
//! network or database dependency.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use docuchat::chat::ChatPipeline;
use docuchat::embedding::HashEmbeddingClient;
use docuchat::error::{Result, ServiceError};
use docuchat::generation::GenerationClient;
use docuchat::ingest::ingest_document;
use docuchat::models::Message;
use docuchat::prompt::{build_context, build_system_instruction, NO_CONTEXT_SENTINEL};
use docuchat::retrieve::retrieve;
use docuchat::store::memory::MemoryStore;
use docuchat::store::Store;

const DIMS: usize = 64;

/// Answers with a fixed string; never fails.
struct StaticGenerator(&'static str);

#[async_trait]
impl GenerationClient for StaticGenerator {
    async fn complete(&self, _: &str, _: &[Message], _: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Always fails with an upstream error.
struct BrokenGenerator;

#[async_trait]
impl GenerationClient for BrokenGenerator {
    async fn complete(&self, _: &str, _: &[Message], _: &str) -> Result<String> {
        Err(ServiceError::GenerationService(
            "model backend unreachable".to_string(),
        ))
    }
}

fn fixtures() -> (Arc<MemoryStore>, HashEmbeddingClient) {
    (Arc::new(MemoryStore::new(DIMS)), HashEmbeddingClient::new(DIMS))
}

const ATLAS: &str = "\
The capital of Testland is Zedville.\n\
\n\
Testland's national railway runs between Zedville and Port Quorum twice daily.\n\
\n\
The annual rainfall in the Quorum valley averages ninety centimeters.";

#[tokio::test]
async fn ingested_paragraph_is_retrievable() {
    let (store, embedder) = fixtures();

    let report = ingest_document(store.as_ref(), &embedder, 20, "atlas.pdf", ATLAS)
        .await
        .unwrap();
    assert_eq!(report.chunk_count, 3);

    let results = retrieve(
        store.as_ref(),
        &embedder,
        "What is the capital of Testland?",
        4,
    )
    .await
    .unwrap();

    assert!(
        results.contains(&"The capital of Testland is Zedville.".to_string()),
        "expected the capital chunk in the top-4, got {:?}",
        results
    );
}

#[tokio::test]
async fn whitespace_document_writes_nothing() {
    let (store, embedder) = fixtures();

    let report = ingest_document(store.as_ref(), &embedder, 20, "scan.pdf", " \n\n\t \n ")
        .await
        .unwrap();
    assert_eq!(report.chunk_count, 0);
    assert_eq!(store.chunk_count(), 0);
}

#[tokio::test]
async fn deleting_unknown_source_is_idempotent_success() {
    let (store, _) = fixtures();

    assert_eq!(store.delete_by_source("nonexistent.pdf").await.unwrap(), 0);
    assert_eq!(store.delete_by_source("nonexistent.pdf").await.unwrap(), 0);
}

#[tokio::test]
async fn wipe_clears_sources_and_search() {
    let (store, embedder) = fixtures();
    ingest_document(store.as_ref(), &embedder, 20, "atlas.pdf", ATLAS)
        .await
        .unwrap();
    assert!(!store.list_sources().await.unwrap().is_empty());

    store.delete_all().await.unwrap();

    assert!(store.list_sources().await.unwrap().is_empty());
    let results = retrieve(store.as_ref(), &embedder, "capital of Testland", 4)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn empty_retrieval_produces_sentinel_instruction() {
    let (store, embedder) = fixtures();

    let results = retrieve(store.as_ref(), &embedder, "anything", 4).await.unwrap();
    let context = build_context(&results);
    assert_eq!(context, NO_CONTEXT_SENTINEL);

    let instruction = build_system_instruction(&context);
    assert!(instruction.contains(NO_CONTEXT_SENTINEL));
}

#[tokio::test]
async fn chat_turn_round_trip() {
    let (store, _) = fixtures();
    let embedder = Arc::new(HashEmbeddingClient::new(DIMS));
    ingest_document(store.as_ref(), embedder.as_ref(), 20, "atlas.pdf", ATLAS)
        .await
        .unwrap();

    let pipeline = ChatPipeline::new(
        store.clone(),
        embedder,
        Arc::new(StaticGenerator("The capital is Zedville.")),
        4,
    );

    let answer = pipeline
        .answer(
            "user-7",
            &[json!({"role": "user", "content": "What is the capital of Testland?"})],
        )
        .await
        .unwrap();
    assert_eq!(answer, "The capital is Zedville.");

    let turns = store.recent_turns("user-7", 50).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "What is the capital of Testland?");
    assert_eq!(turns[1].content, "The capital is Zedville.");
}

#[tokio::test]
async fn generation_failure_degrades_to_readable_text() {
    let (store, _) = fixtures();
    let pipeline = ChatPipeline::new(
        store,
        Arc::new(HashEmbeddingClient::new(DIMS)),
        Arc::new(BrokenGenerator),
        4,
    );

    let text = pipeline
        .answer_with_fallback(
            "user-7",
            &[json!({"role": "user", "content": "Is anyone out there?"})],
        )
        .await;

    assert!(!text.is_empty());
    assert!(text.contains("generation service error"));
    assert!(text.contains("model backend unreachable"));
}
