//! Top-k retrieval: embed the question, search the store.
//!
//! No query-embedding cache: each question is a fresh call to the
//! embedding backend.

use crate::embedding::{EmbedIntent, EmbeddingClient};
use crate::error::Result;
use crate::store::Store;

/// Retrieve the contents of the `k` chunks most similar to `question`,
/// most-similar first. An empty result is valid and common on a fresh or
/// recently wiped store.
pub async fn retrieve(
    store: &dyn Store,
    embedder: &dyn EmbeddingClient,
    question: &str,
    k: usize,
) -> Result<Vec<String>> {
    let query_vec = embedder.embed(question, EmbedIntent::Query).await?;
    store.search(&query_vec, k).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::models::Chunk;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_retrieve_orders_by_similarity() {
        let embedder = HashEmbeddingClient::new(64);
        let store = MemoryStore::new(64);

        let texts = [
            "The office opens at nine in the morning every weekday.",
            "Reimbursement claims must be filed within thirty days.",
            "The capital of Testland is Zedville.",
        ];
        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let embedding = embedder.embed(text, EmbedIntent::Document).await.unwrap();
            chunks.push(Chunk {
                id: format!("c{i}"),
                source_file: "handbook.pdf".to_string(),
                content: text.to_string(),
                embedding,
                created_at: Utc::now(),
            });
        }
        store.insert_chunks(&chunks).await.unwrap();

        let results = retrieve(&store, &embedder, "What is the capital of Testland?", 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], "The capital of Testland is Zedville.");
    }

    #[tokio::test]
    async fn test_retrieve_empty_store() {
        let embedder = HashEmbeddingClient::new(64);
        let store = MemoryStore::new(64);
        let results = retrieve(&store, &embedder, "anything", 4).await.unwrap();
        assert!(results.is_empty());
    }
}
