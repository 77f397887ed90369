//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for a new document: chunking → batch embedding →
//! chunk construction → store write. Any failure past chunking aborts the
//! whole ingestion and surfaces the error; re-ingesting the same file
//! without deleting it first produces duplicate chunks, so callers wanting
//! replace semantics run `delete_by_source` beforehand.

use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

use crate::chunker::split_passages;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedding_client, EmbedIntent, EmbeddingClient};
use crate::extract;
use crate::models::Chunk;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub chunk_count: usize,
}

/// Ingest one document's extracted text under the name `file_name`.
///
/// A document that yields zero qualifying passages (whitespace-only,
/// image-only) succeeds with `chunk_count = 0` and performs no store
/// writes. Everything else is embedded with
/// [`EmbedIntent::Document`] and written in one batch.
pub async fn ingest_document(
    store: &dyn Store,
    embedder: &dyn EmbeddingClient,
    min_chars: usize,
    file_name: &str,
    text: &str,
) -> crate::error::Result<IngestReport> {
    let passages = split_passages(text, min_chars);
    if passages.is_empty() {
        tracing::info!(file = file_name, "document produced no qualifying passages");
        return Ok(IngestReport { chunk_count: 0 });
    }

    let vectors = embedder.embed_batch(&passages, EmbedIntent::Document).await?;

    let now = chrono::Utc::now();
    let chunks: Vec<Chunk> = passages
        .into_iter()
        .zip(vectors)
        .map(|(content, embedding)| Chunk {
            id: Uuid::new_v4().to_string(),
            source_file: file_name.to_string(),
            content,
            embedding,
            created_at: now,
        })
        .collect();

    store.insert_chunks(&chunks).await?;
    tracing::info!(file = file_name, chunks = chunks.len(), "document indexed");

    Ok(IngestReport {
        chunk_count: chunks.len(),
    })
}

/// CLI entry point: read a file from disk, extract its text, and ingest it.
pub async fn run_ingest(config: &Config, path: &Path, name: Option<String>) -> Result<()> {
    let file_name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });

    let bytes = std::fs::read(path)?;
    let content_type = extract::detect_content_type(&file_name);
    let text = extract::extract_text(&bytes, content_type)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), config.embedding.dims);
    let embedder = create_embedding_client(&config.embedding)?;

    let report = ingest_document(
        &store,
        embedder.as_ref(),
        config.chunking.min_chars,
        &file_name,
        &text,
    )
    .await?;

    println!("ingest {}", file_name);
    println!("  chunks indexed: {}", report.chunk_count);
    println!("ok");

    pool.close().await;
    Ok(())
}
