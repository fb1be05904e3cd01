use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HearthError;
use crate::types::SearchMode;

/// Top-level configuration loaded from `.hearth.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use hearth_core::HearthConfig;
///
/// let config = HearthConfig::default();
/// assert_eq!(config.search.default_limit, 10);
/// assert_eq!(config.embedding.provider, "hash");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    /// Home Assistant connection settings.
    #[serde(default)]
    pub hass: HassConfig,
    /// Embedding provider settings for semantic search.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Search defaults and retrieval deadlines.
    #[serde(default)]
    pub search: SearchConfig,
    /// On-disk vector index settings.
    #[serde(default)]
    pub index: IndexConfig,
}

impl HearthConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Io`] if the file cannot be read, or
    /// [`HearthError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hearth_core::HearthConfig;
    /// use std::path::Path;
    ///
    /// let config = HearthConfig::from_file(Path::new(".hearth.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, HearthError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_core::HearthConfig;
    ///
    /// let toml = r#"
    /// [search]
    /// default_limit = 25
    /// "#;
    /// let config = HearthConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.search.default_limit, 25);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, HearthError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `HASS_URL` / `HASS_TOKEN` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from an arbitrary lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_core::HearthConfig;
    ///
    /// let config = HearthConfig::default().apply_env(|key| match key {
    ///     "HASS_URL" => Some("http://ha.lan:8123".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.hass.url, "http://ha.lan:8123");
    /// ```
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("HASS_URL").filter(|v| !v.is_empty()) {
            self.hass.url = url;
        }
        if let Some(token) = lookup("HASS_TOKEN").filter(|v| !v.is_empty()) {
            self.hass.token = Some(token);
        }
        self
    }
}

/// Home Assistant connection settings.
///
/// # Examples
///
/// ```
/// use hearth_core::HassConfig;
///
/// let config = HassConfig::default();
/// assert_eq!(config.url, "http://homeassistant.local:8123");
/// assert_eq!(config.timeout_secs, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HassConfig {
    /// Base URL of the Home Assistant instance.
    #[serde(default = "default_hass_url")]
    pub url: String,
    /// Long-lived access token.
    pub token: Option<String>,
    /// Per-request HTTP timeout in seconds (default: 10).
    #[serde(default = "default_hass_timeout")]
    pub timeout_secs: u64,
}

fn default_hass_url() -> String {
    "http://homeassistant.local:8123".into()
}

fn default_hass_timeout() -> u64 {
    10
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            url: default_hass_url(),
            token: None,
            timeout_secs: default_hass_timeout(),
        }
    }
}

impl HassConfig {
    /// The configured token.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if no token is configured.
    pub fn resolve_token(&self) -> Result<String, HearthError> {
        self.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
            HearthError::Config(
                "Home Assistant token not found: set hass.token in .hearth.toml or HASS_TOKEN env var"
                    .into(),
            )
        })
    }
}

/// Configuration for embedding providers used by semantic search.
///
/// # Examples
///
/// ```
/// use hearth_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.provider, "hash");
/// assert_eq!(config.dimensions, 256);
/// assert_eq!(config.api_key_env(), None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: `"hash"` (offline), `"voyage"` or `"openai"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// API key for remote providers.
    pub api_key: Option<String>,
    /// Model name (default: `"hash-256"`).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Override for the provider's base URL.
    pub base_url: Option<String>,
    /// Embedding dimensions (default: 256).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "hash".into()
}

fn default_embedding_model() -> String {
    "hash-256".into()
}

fn default_embedding_dimensions() -> usize {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            base_url: None,
            dimensions: default_embedding_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    /// Environment variable holding the provider's API key, if it needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self.provider.as_str() {
            "voyage" => Some("VOYAGE_API_KEY"),
            "openai" => Some("OPENAI_API_KEY"),
            _ => None,
        }
    }

    /// The API key from config, falling back to the provider's env var.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if a remote provider has no key.
    pub fn resolve_api_key(&self) -> Result<String, HearthError> {
        if let Some(key) = self.api_key.clone().filter(|k| !k.is_empty()) {
            return Ok(key);
        }
        let env_var = self.api_key_env().ok_or_else(|| {
            HearthError::Config(format!(
                "embedding provider '{}' does not use an API key",
                self.provider
            ))
        })?;
        std::env::var(env_var).map_err(|_| {
            HearthError::Config(format!(
                "embedding API key not found: set embedding.api_key in .hearth.toml or {env_var} env var"
            ))
        })
    }
}

/// Search defaults and retrieval deadlines.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hearth_core::{SearchConfig, SearchMode};
///
/// let config = SearchConfig::default();
/// assert_eq!(config.default_mode, SearchMode::Hybrid);
/// assert_eq!(config.similarity_threshold, 0.7);
/// assert_eq!(config.semantic_timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result limit when the caller gives none (default: 10).
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Upper bound on any requested limit (default: 100).
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Minimum semantic similarity when the caller gives none (default: 0.7).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Mode when the caller gives none (default: hybrid).
    #[serde(default = "default_mode")]
    pub default_mode: SearchMode,
    /// Deadline for embedding + vector lookup in milliseconds (default: 5000).
    #[serde(default = "default_timeout_ms")]
    pub semantic_timeout_ms: u64,
    /// Deadline for snapshot listing in milliseconds (default: 5000).
    #[serde(default = "default_timeout_ms")]
    pub keyword_timeout_ms: u64,
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_mode() -> SearchMode {
    SearchMode::Hybrid
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            similarity_threshold: default_similarity_threshold(),
            default_mode: default_mode(),
            semantic_timeout_ms: default_timeout_ms(),
            keyword_timeout_ms: default_timeout_ms(),
        }
    }
}

impl SearchConfig {
    /// Deadline for the semantic path.
    pub fn semantic_timeout(&self) -> Duration {
        Duration::from_millis(self.semantic_timeout_ms)
    }

    /// Deadline for the keyword path.
    pub fn keyword_timeout(&self) -> Duration {
        Duration::from_millis(self.keyword_timeout_ms)
    }
}

/// On-disk vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite database holding entity embeddings (default: `.hearth/index.db`).
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

fn default_index_path() -> PathBuf {
    PathBuf::from(".hearth/index.db")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}
