//! Core data models used throughout docuchat.
//!
//! These types represent the chunks, chat turns, and normalized messages
//! that flow through the ingestion and chat pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A retrieval unit: one passage of a source document plus its embedding.
///
/// Owned exclusively by the store once ingested; never mutated afterwards.
/// Destroyed either per source file or by a full wipe.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Identifier of the originating document; groups chunks for deletion.
    pub source_file: String,
    pub content: String,
    /// Fixed-dimensionality embedding vector; all chunks in a store share
    /// the same dimensionality.
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Speaker of a chat message. Closed set; externally-supplied role strings
/// are folded into it via [`Role::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Map an arbitrary external role value into the closed set.
    ///
    /// `"assistant"` and `"model"` become [`Role::Assistant`]; everything
    /// else, including unknown or missing values, becomes [`Role::User`].
    /// This is the single coercion point for role values — both the chat
    /// pipeline and the history sanitizer go through it.
    pub fn normalize(raw: &str) -> Role {
        match raw {
            "assistant" | "model" => Role::Assistant,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation, as persisted by the history store.
///
/// Append-only: turns are never mutated or deleted. Turns for a given
/// `user_id` are totally ordered by `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A normalized `{role, content}` message, the only shape the generation
/// client ever sees. External records are reduced to this via
/// [`sanitize_history`](crate::prompt::sanitize_history).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}
