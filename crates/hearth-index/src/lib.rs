//! Entity embeddings: providers, descriptions, storage, and the vector index.
//!
//! Entities are rendered to a short textual description, embedded by an
//! [`embedding::Embedder`], persisted in SQLite, and served from an
//! immutable in-memory [`vectors::IndexSnapshot`]. Re-indexing publishes a
//! whole new snapshot so concurrent readers never see a partial update.

pub mod describe;
pub mod embedding;
pub mod hash_embedder;
pub mod indexer;
pub mod store;
pub mod vectors;

pub use describe::{describe_entity, description_hash};
pub use embedding::{embedder_from_config, Embedder, EmbeddingClient};
pub use hash_embedder::HashEmbedder;
pub use indexer::{Indexer, SyncReport};
pub use store::{EntityStore, StoreStats};
pub use vectors::{cosine_similarity, IndexEntry, IndexSnapshot, IndexStatus, NearestFilter, Neighbor, VectorIndex};
