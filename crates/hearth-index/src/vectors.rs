//! In-memory vector index with atomic snapshot replacement.
//!
//! An [`IndexSnapshot`] is immutable once built. [`VectorIndex`] holds the
//! current snapshot behind an `Arc`; readers clone the `Arc` and search
//! without holding any lock, and a re-index swaps in a complete new
//! snapshot with a higher version.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use hearth_core::{Attributes, HearthError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One embedded entity.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Entity id.
    pub entity_id: String,
    /// Entity domain.
    pub domain: String,
    /// Area the entity belonged to when embedded.
    pub area_id: Option<String>,
    /// Display name when embedded.
    pub friendly_name: String,
    /// SHA-256 of the embedded description.
    pub description_hash: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

impl IndexEntry {
    /// Metadata attached to candidates produced from this entry.
    pub fn metadata(&self) -> Attributes {
        let mut metadata = Attributes::new();
        metadata.insert("domain".into(), Value::from(self.domain.clone()));
        metadata.insert("friendly_name".into(), Value::from(self.friendly_name.clone()));
        if let Some(area) = &self.area_id {
            metadata.insert("area_id".into(), Value::from(area.clone()));
        }
        metadata
    }
}

/// Optional restrictions applied before ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestFilter<'a> {
    /// Keep only entries in this domain.
    pub domain: Option<&'a str>,
    /// Keep only entries in this area. Entries without an area never match.
    pub area: Option<&'a str>,
}

impl NearestFilter<'_> {
    fn accepts(&self, entry: &IndexEntry) -> bool {
        self.domain.map_or(true, |d| entry.domain == d)
            && self
                .area
                .map_or(true, |a| entry.area_id.as_deref() == Some(a))
    }
}

/// A nearest-neighbour hit with its raw cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Entity id.
    pub entity_id: String,
    /// Display name when embedded.
    pub friendly_name: String,
    /// Entity domain.
    pub domain: String,
    /// Raw cosine similarity.
    pub score: f64,
    /// Entry metadata.
    pub metadata: Attributes,
}

/// Summary of the published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Snapshot version; 0 means nothing has been published.
    pub version: u64,
    /// Number of indexed entities.
    pub entities: usize,
    /// Vector dimensionality, 0 when empty.
    pub dimensions: usize,
    /// Embedding model of the snapshot.
    pub model: String,
    /// Indexed entities per domain.
    pub domains: BTreeMap<String, usize>,
}

/// An immutable set of embedded entities.
///
/// # Examples
///
/// ```
/// use hearth_index::vectors::{IndexEntry, IndexSnapshot, NearestFilter};
///
/// let entry = IndexEntry {
///     entity_id: "light.porch".into(),
///     domain: "light".into(),
///     area_id: None,
///     friendly_name: "Porch".into(),
///     description_hash: "h".into(),
///     vector: vec![1.0, 0.0],
/// };
/// let snapshot = IndexSnapshot::new(1, "m", vec![entry]).unwrap();
/// let hits = snapshot.nearest(&[1.0, 0.0], 5, NearestFilter::default()).unwrap();
/// assert_eq!(hits[0].entity_id, "light.porch");
/// ```
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    version: u64,
    model: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl IndexSnapshot {
    /// Build a snapshot, checking that every vector has the same length.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Embedding`] on mixed or zero dimensions.
    pub fn new(version: u64, model: &str, entries: Vec<IndexEntry>) -> Result<Self, HearthError> {
        let dimensions = entries.first().map_or(0, |e| e.vector.len());
        if let Some(bad) = entries
            .iter()
            .find(|e| e.vector.len() != dimensions || e.vector.is_empty())
        {
            return Err(HearthError::Embedding(format!(
                "entity '{}' has a {}-dimensional vector, expected {dimensions}",
                bad.entity_id,
                bad.vector.len()
            )));
        }

        Ok(Self {
            version,
            model: model.to_string(),
            dimensions,
            entries,
        })
    }

    /// Snapshot version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Embedding model that produced the vectors.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Vector dimensionality, 0 when empty.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, ordered as published.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Up to `k` entries closest to `vector`, best first; ties by entity id.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Embedding`] if `vector` does not match the
    /// snapshot dimensionality.
    pub fn nearest(
        &self,
        vector: &[f32],
        k: usize,
        filter: NearestFilter<'_>,
    ) -> Result<Vec<Neighbor>, HearthError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(HearthError::Embedding(format!(
                "query vector has {} dimensions but the index has {}",
                vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(f64, &IndexEntry)> = self
            .entries
            .iter()
            .filter(|entry| filter.accepts(entry))
            .map(|entry| (cosine_similarity(vector, &entry.vector), entry))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.entity_id.cmp(&b.1.entity_id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| Neighbor {
                entity_id: entry.entity_id.clone(),
                friendly_name: entry.friendly_name.clone(),
                domain: entry.domain.clone(),
                score,
                metadata: entry.metadata(),
            })
            .collect())
    }

    /// Summary for status reporting.
    pub fn status(&self) -> IndexStatus {
        let mut domains = BTreeMap::new();
        for entry in &self.entries {
            *domains.entry(entry.domain.clone()).or_insert(0) += 1;
        }
        IndexStatus {
            version: self.version,
            entities: self.entries.len(),
            dimensions: self.dimensions,
            model: self.model.clone(),
            domains,
        }
    }
}

/// Holder of the currently published [`IndexSnapshot`].
///
/// # Examples
///
/// ```
/// use hearth_index::vectors::VectorIndex;
///
/// let index = VectorIndex::new();
/// assert_eq!(index.snapshot().version(), 0);
/// let v = index.publish("m", Vec::new()).unwrap();
/// assert_eq!(v, 1);
/// ```
#[derive(Debug, Default)]
pub struct VectorIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl VectorIndex {
    /// An index with an empty version-0 snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Later publishes do not affect it.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the snapshot with `entries`, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Embedding`] if the entries have mixed
    /// dimensions; the current snapshot is left in place.
    pub fn publish(&self, model: &str, entries: Vec<IndexEntry>) -> Result<u64, HearthError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = current.version + 1;
        *current = Arc::new(IndexSnapshot::new(version, model, entries)?);
        Ok(version)
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}
