//! Storage abstraction for docuchat.
//!
//! The [`Store`] trait defines every durable operation the pipeline needs:
//! the vector-store side (chunk writes, similarity search, deletion) and
//! the append-only chat history. Implementations must be `Send + Sync` to
//! work with async runtimes.
//!
//! Two backends are provided: [`SqliteStore`](sqlite::SqliteStore) for the
//! service and [`MemoryStore`](memory::MemoryStore) for tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChatTurn, Chunk, Role};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_chunks`](Store::insert_chunks) | Bulk-durable chunk write |
/// | [`search`](Store::search) | Top-k cosine similarity search |
/// | [`delete_by_source`](Store::delete_by_source) | Remove one document's chunks |
/// | [`delete_all`](Store::delete_all) | Wipe every chunk |
/// | [`list_sources`](Store::list_sources) | Distinct indexed source files |
/// | [`append_turn`](Store::append_turn) | Append one chat turn |
/// | [`recent_turns`](Store::recent_turns) | Most recent turns, oldest first |
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a batch of chunks. The write is transactional where the
    /// backend supports it; any failure surfaces with its cause rather
    /// than being swallowed.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `k` chunk contents ranked by descending similarity to
    /// `query_vec`. Ties resolve to insertion order. An empty store yields
    /// an empty result, never an error.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<String>>;

    /// Remove all chunks of one source file; returns the number removed.
    /// Zero matches is success.
    async fn delete_by_source(&self, file_name: &str) -> Result<u64>;

    /// Remove every chunk. Idempotent.
    async fn delete_all(&self) -> Result<()>;

    /// Distinct source file names currently indexed, sorted.
    async fn list_sources(&self) -> Result<Vec<String>>;

    /// Append one turn to a user's conversation log.
    async fn append_turn(&self, user_id: &str, role: Role, content: &str) -> Result<()>;

    /// The user's most recent `limit` turns, ascending by time.
    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>>;
}
