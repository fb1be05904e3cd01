//! Core types, configuration, and error handling for hearth.
//!
//! This crate provides the shared foundation used by all other hearth crates:
//! - [`HearthError`] - platform error type using `thiserror`
//! - [`RetrievalFailure`] and [`SearchError`] - the search failure taxonomy
//! - [`HearthConfig`] - configuration loaded from `.hearth.toml`
//! - Shared types: [`EntityRecord`], [`SearchMode`], [`QueryDescriptor`],
//!   [`Candidate`], [`EntityMatch`], [`ResultSet`]

mod config;
mod error;
mod types;

pub use config::{EmbeddingConfig, HassConfig, HearthConfig, IndexConfig, SearchConfig};
pub use error::{HearthError, RetrievalFailure, SearchError};
pub use types::{
    Attributes, Candidate, EntityMatch, EntityRecord, MatchSource, QueryDescriptor, ResultSet,
    SearchMode, SearchRequest,
};

/// A convenience `Result` type for hearth operations.
pub type Result<T> = std::result::Result<T, HearthError>;
