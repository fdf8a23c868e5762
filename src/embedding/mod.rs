//! Vector embeddings and similarity math.
//!
//! This module provides the embedding capability used for semantic search:
//!
//! - [`EmbeddingBackend`] - Trait implemented by every embedding variant
//! - [`HashBackend`] - Deterministic token-hashing embeddings, always
//!   available, no model weights required
//! - [`TransformerBackend`] - Candle-based sentence embeddings, loaded on
//!   demand from the Hugging Face hub cache
//! - [`vector`] - Normalization, cosine similarity, and the BLOB layout
//!   vectors are persisted in
//!
//! Backends are resolved through [`resolve_backend`]: an explicit spec wins,
//! then the `MAILSIFT_EMBEDDING_BACKEND` environment variable, then the
//! default transformer model, and finally the hash backend, which cannot
//! fail. Stored vectors are namespaced by [`EmbeddingBackend::identifier`]
//! so vectors from different configurations are never mixed.

mod backend;
mod model;
pub mod vector;

pub use backend::{load_backend, resolve_backend, EmbeddingBackend, HashBackend};
pub use model::TransformerBackend;

use thiserror::Error;

/// Errors that can occur constructing or running an embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding dimension must be a positive integer")]
    InvalidDimension,

    #[error("unknown embedding backend spec: {0}")]
    UnknownBackend(String),

    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("model inference failed: {0}")]
    Inference(#[from] candle_core::Error),
}
