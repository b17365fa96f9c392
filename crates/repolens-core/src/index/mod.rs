//! Indexing pipeline
//!
//! Ignore rules, tree walking, chunking, and chunk embedding.

mod chunker;
mod embedder;
mod ignore;
mod tree;
mod walker;

pub use chunker::*;
pub use embedder::*;
pub use ignore::*;
pub use tree::*;
pub use walker::*;
