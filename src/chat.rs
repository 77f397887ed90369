//! Chat turn orchestration.
//!
//! One [`ChatPipeline`] handles every chat turn: append the user's message
//! to history, retrieve grounding passages, build the strict system
//! instruction, call the generation backend, and append the answer. The
//! pipeline holds injected client handles; construction happens once at
//! the process entry point so tests can substitute stubs.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::error::{Result, ServiceError};
use crate::generation::GenerationClient;
use crate::models::Role;
use crate::prompt::{build_context, build_system_instruction, sanitize_history};
use crate::retrieve::retrieve;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// The query-time RAG pipeline, composed from injected collaborators.
pub struct ChatPipeline {
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn GenerationClient>,
    top_k: usize,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn GenerationClient>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            top_k,
        }
    }

    /// Run one chat turn for `user_id` over the caller-supplied message
    /// records (arbitrary external shape; the latest entry must be the
    /// user's question).
    ///
    /// Flow: append user turn → retrieve → assemble context → generate →
    /// append assistant turn. The assistant turn is only recorded when
    /// generation succeeds.
    pub async fn answer(&self, user_id: &str, messages: &[Value]) -> Result<String> {
        let (question, prior) = split_question(messages)?;

        self.store.append_turn(user_id, Role::User, &question).await?;

        let retrieved = retrieve(
            self.store.as_ref(),
            self.embedder.as_ref(),
            &question,
            self.top_k,
        )
        .await?;
        tracing::debug!(user = user_id, passages = retrieved.len(), "retrieved context");

        let context = build_context(&retrieved);
        let system_instruction = build_system_instruction(&context);
        let history = sanitize_history(prior);

        let answer = self
            .generator
            .complete(&system_instruction, &history, &question)
            .await?;

        self.store
            .append_turn(user_id, Role::Assistant, &answer)
            .await?;

        Ok(answer)
    }

    /// Degraded wrapper used by the chat endpoint: every pipeline failure
    /// becomes readable answer text, so the transport response stays
    /// well-formed even when a backend is down.
    pub async fn answer_with_fallback(&self, user_id: &str, messages: &[Value]) -> String {
        match self.answer(user_id, messages).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(user = user_id, error = %err, "chat turn failed");
                format!("Sorry, I ran into a problem answering that: {err}. Please try again.")
            }
        }
    }
}

/// CLI entry point: ask a one-shot question against the indexed documents.
pub async fn run_ask(config: &Config, question: &str, user: &str) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone(), config.embedding.dims));
    let embedder = crate::embedding::create_embedding_client(&config.embedding)?;
    let generator = crate::generation::create_generation_client(&config.generation)?;
    let pipeline = ChatPipeline::new(store, embedder, generator, config.retrieval.top_k);

    let messages = vec![serde_json::json!({ "role": "user", "content": question })];
    let answer = pipeline.answer(user, &messages).await?;
    println!("{}", answer);

    pool.close().await;
    Ok(())
}

/// CLI entry point: print a user's recent conversation, oldest first.
pub async fn run_history(config: &Config, user: &str, limit: usize) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), config.embedding.dims);

    let turns = store.recent_turns(user, limit).await?;
    if turns.is_empty() {
        println!("No history for {}.", user);
    }
    for turn in turns {
        println!(
            "[{}] {}: {}",
            turn.created_at.format("%Y-%m-%d %H:%M:%S"),
            turn.role.as_str(),
            turn.content
        );
    }

    pool.close().await;
    Ok(())
}

/// Split the latest user question off the raw message list.
fn split_question(messages: &[Value]) -> Result<(String, &[Value])> {
    let (last, prior) = messages
        .split_last()
        .ok_or_else(|| ServiceError::Input("chat request contained no messages".to_string()))?;

    let question = match last.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    if question.trim().is_empty() {
        return Err(ServiceError::Input(
            "latest message has no content".to_string(),
        ));
    }

    Ok((question, prior))
}
