use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Free-form entity attributes as reported by Home Assistant.
pub type Attributes = Map<String, Value>;

/// A Home Assistant entity as seen in one state snapshot.
///
/// Deserializes directly from an item of `GET /api/states`; fields other
/// than `entity_id`, `state` and `attributes` are ignored.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityRecord;
///
/// let light = EntityRecord::new("light.living_room", "on")
///     .with_attribute("friendly_name", "Living Room Light");
/// assert_eq!(light.domain(), "light");
/// assert_eq!(light.object_id(), "living_room");
/// assert_eq!(light.friendly_name(), "Living Room Light");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identifier formatted as `<domain>.<object_id>`.
    pub entity_id: String,
    /// Current state string (`"on"`, `"21.5"`, `"unavailable"`, ...).
    pub state: String,
    /// Entity attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl EntityRecord {
    /// Create a record with no attributes.
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The domain prefix, split on the first `.`.
    ///
    /// An id without a dot is treated as all domain.
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }

    /// The part of the id after the first `.`.
    pub fn object_id(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or("", |(_, object_id)| object_id)
    }

    /// The `friendly_name` attribute, falling back to the entity id.
    pub fn friendly_name(&self) -> &str {
        self.attribute_str("friendly_name")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.entity_id.as_str())
    }

    /// The `area_id` attribute, if the snapshot carries one.
    pub fn area_id(&self) -> Option<&str> {
        self.attribute_str("area_id").filter(|area| !area.is_empty())
    }

    /// A string-valued attribute.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Retrieval strategy requested by a caller.
///
/// # Examples
///
/// ```
/// use hearth_core::SearchMode;
///
/// let mode: SearchMode = "hybrid".parse().unwrap();
/// assert_eq!(mode, SearchMode::Hybrid);
/// assert!("fuzzy".parse::<SearchMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Vector similarity only.
    Semantic,
    /// Substring matching only.
    Keyword,
    /// Vector similarity unioned with substring matching.
    Hybrid,
}

impl SearchMode {
    /// The wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Semantic => "semantic",
            SearchMode::Keyword => "keyword",
            SearchMode::Hybrid => "hybrid",
        }
    }

    /// Whether this mode consults the embedding index.
    pub fn uses_embeddings(self) -> bool {
        matches!(self, SearchMode::Semantic | SearchMode::Hybrid)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(SearchMode::Semantic),
            "keyword" => Ok(SearchMode::Keyword),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(SearchError::InvalidMode(other.to_string())),
        }
    }
}

/// A validated, request-scoped search query.
///
/// # Examples
///
/// ```
/// use hearth_core::{QueryDescriptor, SearchMode};
///
/// let query = QueryDescriptor {
///     text: "   ".into(),
///     domain_filter: None,
///     area_filter: None,
///     limit: 10,
///     similarity_threshold: 0.7,
///     mode: SearchMode::Hybrid,
/// };
/// assert!(query.is_blank());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Natural-language query text.
    pub text: String,
    /// Only return entities of this domain.
    pub domain_filter: Option<String>,
    /// Only return entities in this area.
    pub area_filter: Option<String>,
    /// Maximum number of results (always at least 1).
    pub limit: usize,
    /// Minimum similarity for semantic candidates, in `[0, 1]`.
    pub similarity_threshold: f64,
    /// Retrieval strategy.
    pub mode: SearchMode,
}

impl QueryDescriptor {
    /// Validate raw caller input against the search defaults.
    ///
    /// The mode is checked first. `limit` is clamped into
    /// `1..=max_limit`, the threshold into `[0, 1]` (NaN takes the default),
    /// and blank filters are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidMode`] for an unknown `search_mode`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_core::{QueryDescriptor, SearchConfig, SearchMode, SearchRequest};
    ///
    /// let request = SearchRequest {
    ///     query: "porch".into(),
    ///     limit: Some(0),
    ///     similarity_threshold: Some(1.5),
    ///     domain: Some(" ".into()),
    ///     ..SearchRequest::default()
    /// };
    /// let query = QueryDescriptor::from_request(&request, &SearchConfig::default()).unwrap();
    /// assert_eq!(query.limit, 1);
    /// assert_eq!(query.similarity_threshold, 1.0);
    /// assert_eq!(query.domain_filter, None);
    /// assert_eq!(query.mode, SearchMode::Hybrid);
    /// ```
    pub fn from_request(request: &SearchRequest, config: &SearchConfig) -> Result<Self, SearchError> {
        let mode = match request.search_mode.as_deref() {
            Some(raw) => raw.parse()?,
            None => config.default_mode,
        };

        let limit = request
            .limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit.max(1));

        let similarity_threshold = match request.similarity_threshold {
            Some(t) if !t.is_nan() => t.clamp(0.0, 1.0),
            _ => config.similarity_threshold.clamp(0.0, 1.0),
        };

        Ok(Self {
            text: request.query.clone(),
            domain_filter: non_blank(request.domain.as_deref()),
            area_filter: non_blank(request.area_id.as_deref()),
            limit,
            similarity_threshold,
            mode,
        })
    }

    /// Whether the query text is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Raw search input as received from a caller.
///
/// Everything but `query` is optional; missing values take the configured
/// defaults in [`QueryDescriptor::from_request`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Natural-language query; may be empty.
    #[serde(default)]
    pub query: String,
    /// Domain filter.
    #[serde(default)]
    pub domain: Option<String>,
    /// Area filter.
    #[serde(default)]
    pub area_id: Option<String>,
    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Minimum semantic similarity.
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    /// `semantic`, `keyword` or `hybrid`.
    #[serde(default)]
    pub search_mode: Option<String>,
}

/// Which retrieval path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Vector similarity.
    Semantic,
    /// Substring match or plain listing.
    Keyword,
}

/// A scored, explained search candidate, before formatting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Matched entity.
    pub entity_id: String,
    /// Similarity in `[0, 1]`, rounded to 3 decimals.
    pub similarity_score: f64,
    /// Human-readable match explanation.
    pub explanation: String,
    /// Index-side metadata (domain, area, name) for the entity.
    pub metadata: Attributes,
    /// Retrieval path that produced the candidate.
    pub source: MatchSource,
}

impl Candidate {
    /// The `area_id` carried in the candidate metadata.
    pub fn area_id(&self) -> Option<&str> {
        self.metadata.get("area_id").and_then(Value::as_str)
    }

    /// The domain of the candidate's entity id.
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }
}

/// One entry of a search response.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityMatch;
///
/// let m = EntityMatch {
///     entity_id: "sensor.kitchen_temperature".into(),
///     state: "21.5".into(),
///     domain: "sensor".into(),
///     friendly_name: "Kitchen Temperature".into(),
///     similarity: 0.912,
///     match_reason: "'Kitchen Temperature' (sensor) matched with 91% similarity".into(),
///     metadata: None,
///     brightness: None,
///     unit: Some("°C".into()),
///     temperature: None,
///     media_title: None,
/// };
/// let json = serde_json::to_value(&m).unwrap();
/// assert_eq!(json["unit"], "°C");
/// assert!(json.get("brightness").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Matched entity.
    pub entity_id: String,
    /// Current state.
    pub state: String,
    /// Entity domain.
    pub domain: String,
    /// Display name (falls back to the entity id).
    pub friendly_name: String,
    /// Similarity in `[0, 1]`, rounded to 3 decimals.
    pub similarity: f64,
    /// Why the entity matched.
    pub match_reason: String,
    /// Candidate metadata, when any is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Attributes>,
    /// Light brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<Value>,
    /// Sensor unit of measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Value>,
    /// Climate temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    /// Media player title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_title: Option<Value>,
}

/// The response of a search request.
///
/// `count` always equals `results.len()` and `domains` counts the returned
/// results only.
///
/// # Examples
///
/// ```
/// use hearth_core::ResultSet;
///
/// let failed = ResultSet::failed("lights", "fuzzy", "Invalid search_mode 'fuzzy'");
/// assert_eq!(failed.count, 0);
/// assert!(failed.results.is_empty());
/// assert!(failed.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Query text as submitted.
    pub query: String,
    /// Number of results.
    pub count: usize,
    /// Ranked results.
    pub results: Vec<EntityMatch>,
    /// The mode actually used (after fallback), or the rejected mode string.
    pub search_mode: String,
    /// Result count per domain.
    pub domains: BTreeMap<String, usize>,
    /// Present only when the search could not be served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultSet {
    /// An empty result set carrying an error message.
    pub fn failed(
        query: impl Into<String>,
        search_mode: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            count: 0,
            results: Vec::new(),
            search_mode: search_mode.into(),
            domains: BTreeMap::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the search failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
