//! MCP server interface exposing hearth search to assistants and agents.
//!
//! Implements a Model Context Protocol server using rmcp that exposes
//! `search_entities`, `reindex_entities`, and `index_status` over stdio.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use hearth_core::SearchConfig;
//! use hearth_hass::StaticSnapshot;
//! use hearth_index::{EntityStore, HashEmbedder, Indexer, VectorIndex};
//! use hearth_mcp::tools::HearthServer;
//!
//! # async fn example() -> Result<(), hearth_core::HearthError> {
//! let embedder = Arc::new(HashEmbedder::new(256)?);
//! let indexer = Indexer::new(EntityStore::in_memory()?, embedder, Arc::new(VectorIndex::new()));
//! let server = HearthServer::new(
//!     Arc::new(StaticSnapshot::new(Vec::new())),
//!     Arc::new(indexer),
//!     SearchConfig::default(),
//! );
//! hearth_mcp::server::run_server(server).await?;
//! # Ok(())
//! # }
//! ```

pub mod server;
pub mod tools;
