//! Hybrid entity search.
//!
//! [`planner::HybridSearch`] validates a request, runs semantic and/or
//! keyword retrieval, merges the candidates, and hands them to
//! [`formatter::format_results`]. Retrieval failures degrade to keyword
//! search; nothing escapes [`planner::HybridSearch::search`] except a
//! well-formed [`hearth_core::ResultSet`].

pub mod formatter;
pub mod planner;
pub mod scorer;
pub mod semantic;

pub use formatter::format_results;
pub use planner::HybridSearch;
pub use semantic::{EmbeddingIndex, SemanticIndex, UnavailableIndex};
