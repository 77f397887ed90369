//! SQLite-backed [`Store`] implementation.
//!
//! Chunk embeddings are stored as little-endian f32 BLOBs; similarity
//! search loads the vectors and ranks them by cosine similarity in Rust.
//! Chat turns live in a separate append-only table keyed by user.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Result, ServiceError};
use crate::models::{ChatTurn, Chunk, Role};

use super::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Embedding dimensionality every stored and queried vector must match.
    dims: usize,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ServiceError::Store(format!("failed to begin insert: {}", e)))?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (id, source_file, content, embedding, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.source_file)
            .bind(&chunk.content)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(chunk.created_at.timestamp())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                ServiceError::Store(format!("failed to insert chunk {}: {}", chunk.id, e))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| ServiceError::Store(format!("failed to commit insert: {}", e)))?;
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

        // Insertion (rowid) order in, stable sort by similarity out — equal
        // scores keep insertion order.
        let rows = sqlx::query("SELECT content, embedding FROM chunks ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f32, String)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let similarity = cosine_similarity(query_vec, &blob_to_vec(&blob));
                (similarity, row.get("content"))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, content)| content).collect())
    }

    async fn delete_by_source(&self, file_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_file = ?")
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT source_file FROM chunks ORDER BY source_file")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("source_file")).collect())
    }

    async fn append_turn(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_turns (user_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(content)
        .bind(chrono::Utc::now().timestamp_micros())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, role, content, created_at
            FROM chat_turns
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut turns: Vec<ChatTurn> = rows
            .iter()
            .map(|row| {
                let role: String = row.get("role");
                let created_at: i64 = row.get("created_at");
                ChatTurn {
                    user_id: row.get("user_id"),
                    role: Role::normalize(&role),
                    content: row.get("content"),
                    created_at: chrono::DateTime::from_timestamp_micros(created_at)
                        .unwrap_or_default(),
                }
            })
            .collect();

        turns.reverse();
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::apply_schema;
    use chrono::Utc;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn test_store(dims: usize) -> (tempfile::TempDir, SqliteStore) {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool, dims))
    }

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
    async fn test_insert_and_search_ranking() {
        let (_tmp, store) = test_store(2).await;
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
    async fn test_search_empty_store() {
        let (_tmp, store) = test_store(2).await;
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dims_mismatch_rejected() {
        let (_tmp, store) = test_store(3).await;
        let err = store
            .insert_chunks(&[chunk("a", "f.pdf", "x", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(store.list_sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_source_and_wipe() {
        let (_tmp, store) = test_store(2).await;
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
        assert_eq!(store.list_sources().await.unwrap(), vec!["keep.pdf"]);

        store.delete_all().await.unwrap();
        store.delete_all().await.unwrap();
        assert!(store.list_sources().await.unwrap().is_empty());
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_turns_round_trip_ascending() {
        let (_tmp, store) = test_store(2).await;
        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_turn("u1", role, &format!("turn {i}"))
                .await
                .unwrap();
        }
        store.append_turn("u2", Role::User, "other").await.unwrap();

        let turns = store.recent_turns("u1", 4).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "turn 2");
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[3].content, "turn 5");
        assert_eq!(turns[3].role, Role::Assistant);
        assert!(turns.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
