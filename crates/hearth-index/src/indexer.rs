//! Keeps the persisted store and the published vector index in step with
//! a set of entities.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use hearth_core::{EntityRecord, HearthError};
use serde::{Deserialize, Serialize};

use crate::describe::{describe_entity, description_hash};
use crate::embedding::Embedder;
use crate::store::{EntityStore, StoreStats};
use crate::vectors::{IndexEntry, VectorIndex};

/// Outcome of [`Indexer::sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Entities embedded in this run (new or changed descriptions).
    pub embedded: usize,
    /// Entities whose stored embedding was reused.
    pub unchanged: usize,
    /// Entities dropped because they left the snapshot.
    pub removed: usize,
    /// Entities in the published index.
    pub total: usize,
    /// Published snapshot version.
    pub version: u64,
}

/// Embeds entities into an [`EntityStore`] and publishes them to a
/// [`VectorIndex`].
pub struct Indexer {
    store: Mutex<EntityStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
}

impl Indexer {
    /// Create an indexer publishing into `index`.
    pub fn new(store: EntityStore, embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>) -> Self {
        Self {
            store: Mutex::new(store),
            embedder,
            index,
        }
    }

    /// The index this indexer publishes to.
    pub fn index(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.index)
    }

    /// The embedder used for documents.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Statistics of the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on query failure.
    pub fn store_stats(&self) -> Result<StoreStats, HearthError> {
        self.with_store(|store| store.stats())
    }

    /// Publish what is already stored, without embedding anything.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] if the store was built with a
    /// different embedding model, or on read failure.
    pub fn load(&self) -> Result<u64, HearthError> {
        let entries = self.with_store(|store| {
            self.check_model(store)?;
            store.load_entries()
        })?;
        let count = entries.len();
        let version = self.index.publish(self.embedder.model(), entries)?;
        tracing::info!(entities = count, version, "loaded stored index");
        Ok(version)
    }

    /// Bring the index in line with `entities` and publish a new snapshot.
    ///
    /// Only entities whose description changed are sent to the embedder.
    /// Entities absent from `entities` are removed. With `rebuild`, the
    /// store is cleared first and everything is re-embedded.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Embedding`] if embedding fails and
    /// [`HearthError::Database`] on a store failure or model mismatch. The
    /// previously published snapshot stays in place on error.
    pub async fn sync(
        &self,
        entities: &[EntityRecord],
        rebuild: bool,
    ) -> Result<SyncReport, HearthError> {
        let current: BTreeMap<&str, &EntityRecord> = entities
            .iter()
            .map(|record| (record.entity_id.as_str(), record))
            .collect();

        let existing = self.with_store(|store| {
            if rebuild {
                store.clear()?;
            }
            self.check_model(store)?;
            store.description_hashes()
        })?;

        let mut pending = Vec::new();
        let mut unchanged = 0;
        for record in current.values() {
            let description = describe_entity(record);
            let hash = description_hash(&description);
            if existing.get(&record.entity_id) == Some(&hash) {
                unchanged += 1;
            } else {
                pending.push((*record, description, hash));
            }
        }

        let stale: Vec<String> = existing
            .keys()
            .filter(|id| !current.contains_key(id.as_str()))
            .cloned()
            .collect();

        let texts: Vec<String> = pending.iter().map(|(_, text, _)| text.clone()).collect();
        tracing::debug!(pending = texts.len(), unchanged, stale = stale.len(), "embedding entities");
        let vectors = self.embedder.embed_documents(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(HearthError::Embedding(format!(
                "embedder returned {} vectors for {} descriptions",
                vectors.len(),
                texts.len()
            )));
        }

        let embedded: Vec<(IndexEntry, String)> = pending
            .into_iter()
            .zip(vectors)
            .map(|((record, description, hash), vector)| {
                let entry = IndexEntry {
                    entity_id: record.entity_id.clone(),
                    domain: record.domain().to_string(),
                    area_id: record.area_id().map(String::from),
                    friendly_name: record.friendly_name().to_string(),
                    description_hash: hash,
                    vector,
                };
                (entry, description)
            })
            .collect();

        let model = self.embedder.model();
        let entries = self.with_store(|store| {
            if let Some((first, _)) = embedded.first() {
                store.set_embedding_model(model, first.vector.len())?;
            }
            store.upsert(&embedded)?;
            store.remove(&stale)?;
            store.load_entries()
        })?;

        let total = entries.len();
        let version = self.index.publish(model, entries)?;
        let report = SyncReport {
            embedded: embedded.len(),
            unchanged,
            removed: stale.len(),
            total,
            version,
        };
        tracing::info!(
            embedded = report.embedded,
            unchanged = report.unchanged,
            removed = report.removed,
            total = report.total,
            version = report.version,
            "index synchronized"
        );
        Ok(report)
    }

    fn check_model(&self, store: &EntityStore) -> Result<(), HearthError> {
        match store.embedding_model()? {
            Some((stored, _)) if stored != self.embedder.model() => Err(HearthError::Database(
                format!(
                    "Index was built with {stored} but the configured embedder is {}. \
                     Re-index with --rebuild.",
                    self.embedder.model()
                ),
            )),
            _ => Ok(()),
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut EntityStore) -> Result<T, HearthError>,
    ) -> Result<T, HearthError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| HearthError::Database("index store lock poisoned".into()))?;
        f(&mut store)
    }
}
