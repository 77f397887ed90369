//! Error taxonomy for the chat and ingestion pipeline.
//!
//! Every fallible pipeline operation returns [`ServiceError`]. The variants
//! map one-to-one onto the failure classes the HTTP layer and the CLI need
//! to distinguish:
//!
//! | Variant | Meaning | Typical handling |
//! |---------|---------|------------------|
//! | [`Input`](ServiceError::Input) | Empty/missing file, malformed request | 400, never retried |
//! | [`EmbeddingService`](ServiceError::EmbeddingService) | Embedding backend call failed | ingestion aborts; chat degrades |
//! | [`GenerationService`](ServiceError::GenerationService) | Generation backend call failed | chat degrades to a readable message |
//! | [`Store`](ServiceError::Store) | Durability-layer read/write/delete failed | surfaced to caller |
//! | [`Auth`](ServiceError::Auth) | Missing or unknown caller identity | 401, before any core logic |
//!
//! No variant is retried anywhere in the pipeline; each external-call
//! failure is surfaced exactly once to the caller.

use thiserror::Error;

/// Pipeline error, classified by the failing collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller supplied input the pipeline cannot act on.
    #[error("invalid input: {0}")]
    Input(String),

    /// The embedding backend rejected or failed the call.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The generation backend rejected or failed the call.
    #[error("generation service error: {0}")]
    GenerationService(String),

    /// The durable store failed a read, write, or delete.
    #[error("store error: {0}")]
    Store(String),

    /// The caller could not be identified.
    #[error("unauthorized: {0}")]
    Auth(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Store(err.to_string())
    }
}

/// Shorthand result type used throughout the pipeline modules.
pub type Result<T> = std::result::Result<T, ServiceError>;
