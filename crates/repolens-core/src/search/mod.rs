//! Search engine module
//!
//! Provides:
//! - Flat and IVF nearest-neighbor indexes over chunk embeddings
//! - Two-file index persistence with consistency checks
//! - Ranked retrieval with threshold and documentation penalty

mod clustering;
mod query;
mod retrieval;
mod store;
mod vector_index;

pub use clustering::{assign_to_nearest_centroid, kmeans_clustering, squared_l2, KMeansResult};
pub use query::preprocess_query;
pub use retrieval::{is_documentation, similarity, RetrievalResult, Retriever};
pub use store::{IndexManifest, IndexStore, LoadedIndex};
pub use vector_index::{cluster_count, Neighbor, Topology, VectorIndex};
