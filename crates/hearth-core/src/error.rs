use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur across the hearth platform.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate reports it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use hearth_core::HearthError;
///
/// let err = HearthError::Config("missing Home Assistant token".into());
/// assert!(err.to_string().contains("missing Home Assistant token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HearthError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(help("run `hearth init` to create a .hearth.toml, or check your environment"))]
    Config(String),

    /// Home Assistant API failure.
    #[error("Home Assistant error: {0}")]
    Hass(String),

    /// Embedding provider failure.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Index database failure.
    #[error("database error: {0}")]
    Database(String),

    /// An operation did not complete within its deadline.
    #[error("{operation} timed out after {ms}ms", ms = .after.as_millis())]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

/// A retrieval path (vector lookup or keyword listing) failed.
///
/// Recoverable by design: the search planner catches it and either falls
/// back to keyword search or renders it into the result body.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hearth_core::RetrievalFailure;
///
/// let err = RetrievalFailure::Timeout { stage: "semantic", after: Duration::from_millis(250) };
/// assert_eq!(err.to_string(), "semantic lookup timed out after 250ms");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalFailure {
    /// The text could not be embedded.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector index is empty, unloaded, or inconsistent.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// The entity snapshot provider could not be reached.
    #[error("entity snapshot unavailable: {0}")]
    Snapshot(String),

    /// The lookup exceeded its deadline.
    #[error("{stage} lookup timed out after {ms}ms", ms = .after.as_millis())]
    Timeout {
        /// Which retrieval path timed out (`"semantic"` or `"keyword"`).
        stage: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },
}

impl From<HearthError> for RetrievalFailure {
    fn from(err: HearthError) -> Self {
        match err {
            HearthError::Embedding(msg) => RetrievalFailure::Embedding(msg),
            HearthError::Database(msg) => RetrievalFailure::IndexUnavailable(msg),
            HearthError::Timeout { after, .. } => RetrievalFailure::Timeout {
                stage: "snapshot",
                after,
            },
            other => RetrievalFailure::Snapshot(other.to_string()),
        }
    }
}

/// Failures of a search request.
///
/// Never escapes the search entry point: every variant is rendered into the
/// `error` field of a [`crate::ResultSet`].
///
/// # Examples
///
/// ```
/// use hearth_core::SearchError;
///
/// let err = SearchError::InvalidMode("fuzzy".into());
/// assert!(err.to_string().contains("'fuzzy'"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The caller supplied a search mode outside `semantic`, `keyword`, `hybrid`.
    #[error("Invalid search_mode '{0}'. Must be one of: semantic, keyword, hybrid")]
    InvalidMode(String),

    /// Semantic retrieval failed.
    #[error("semantic search failed: {0}")]
    Retrieval(#[source] RetrievalFailure),

    /// Keyword retrieval failed and there is nothing left to fall back to.
    #[error("keyword search failed: {0}")]
    KeywordRetrieval(#[source] RetrievalFailure),
}
