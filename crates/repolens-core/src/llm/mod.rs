//! Embedding integration
//!
//! The [`Embedder`] trait and an implementation backed by an external
//! OpenAI-compatible embedding service.

mod http_embedder;
mod traits;

pub use http_embedder::HttpEmbedder;
pub use traits::*;
