//! In-memory [`Store`] implementation for tests.
//!
//! Chunks and turns live in `Vec`s behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every stored vector, mirroring the
//! SQLite backend's ranking semantics.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Result, ServiceError};
use crate::models::{ChatTurn, Chunk, Role};

use super::Store;

/// In-memory store for tests and experiments.
pub struct MemoryStore {
    dims: usize,
    chunks: RwLock<Vec<Chunk>>,
    turns: RwLock<Vec<ChatTurn>>,
}

impl MemoryStore {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            chunks: RwLock::new(Vec::new()),
            turns: RwLock::new(Vec::new()),
        }
    }

    /// Number of chunks currently held; used by tests to assert on writes.
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().unwrap().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dims {
                return Err(ServiceError::Store(format!(
                    "chunk {} has embedding dimensionality {}, store expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    self.dims
                )));
            }
        }
        self.chunks.write().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<String>> {
        if query_vec.len() != self.dims {
            return Err(ServiceError::Store(format!(
                "query vector dimensionality {} does not match store dimensionality {}",
                query_vec.len(),
                self.dims
            )));
        }

        let chunks = self.chunks.read().unwrap();
        let mut scored: Vec<(f32, String)> = chunks
            .iter()
            .map(|c| (cosine_similarity(query_vec, &c.embedding), c.content.clone()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, content)| content).collect())
    }

    async fn delete_by_source(&self, file_name: &str) -> Result<u64> {
        let mut chunks = self.chunks.write().unwrap();
        let before = chunks.len();
        chunks.retain(|c| c.source_file != file_name);
        Ok((before - chunks.len()) as u64)
    }

    async fn delete_all(&self) -> Result<()> {
        self.chunks.write().unwrap().clear();
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let chunks = self.chunks.read().unwrap();
        let mut sources: Vec<String> = chunks.iter().map(|c| c.source_file.clone()).collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn append_turn(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        self.turns.write().unwrap().push(ChatTurn {
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let turns = self.turns.read().unwrap();
        let matching: Vec<ChatTurn> = turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        let start = matching.len().saturating_sub(limit);
        Ok(matching[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunk(id: &str, source: &str, content: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_file: source.to_string(),
            content: content.to_string(),
            embedding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = MemoryStore::new(2);
        store
            .insert_chunks(&[
                chunk("a", "f.pdf", "east", vec![1.0, 0.0]),
                chunk("b", "f.pdf", "north", vec![0.0, 1.0]),
                chunk("c", "f.pdf", "northeast", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(results, vec!["east".to_string(), "northeast".to_string()]);
    }

    #[tokio::test]
    async fn test_search_empty_store_returns_empty() {
        let store = MemoryStore::new(2);
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimensionality_mismatch_rejected() {
        let store = MemoryStore::new(3);
        let err = store
            .insert_chunks(&[chunk("a", "f.pdf", "text", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));

        let err = store.search(&[1.0, 0.0], 4).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete_by_source_counts_and_is_idempotent() {
        let store = MemoryStore::new(2);
        store
            .insert_chunks(&[
                chunk("a", "keep.pdf", "x", vec![1.0, 0.0]),
                chunk("b", "drop.pdf", "y", vec![0.0, 1.0]),
                chunk("c", "drop.pdf", "z", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_source("drop.pdf").await.unwrap(), 2);
        assert_eq!(store.delete_by_source("drop.pdf").await.unwrap(), 0);
        assert_eq!(store.delete_by_source("never-there.pdf").await.unwrap(), 0);
        assert_eq!(store.list_sources().await.unwrap(), vec!["keep.pdf"]);
    }

    #[tokio::test]
    async fn test_delete_all_wipes_everything() {
        let store = MemoryStore::new(2);
        store
            .insert_chunks(&[chunk("a", "f.pdf", "x", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.delete_all().await.unwrap();
        store.delete_all().await.unwrap();
        assert!(store.list_sources().await.unwrap().is_empty());
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_turns_ascending_and_bounded() {
        let store = MemoryStore::new(2);
        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_turn("u1", role, &format!("turn {i}"))
                .await
                .unwrap();
        }
        store.append_turn("u2", Role::User, "other user").await.unwrap();

        let turns = store.recent_turns("u1", 4).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "turn 2");
        assert_eq!(turns[3].content, "turn 5");
        assert!(turns.iter().all(|t| t.user_id == "u1"));
    }
}
