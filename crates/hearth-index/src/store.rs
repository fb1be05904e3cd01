//! SQLite persistence for entity embeddings.
//!
//! Vectors are stored as little-endian `f32` BLOBs next to the description
//! hash that produced them, so a restart can republish the index without
//! calling the embedding provider again.

use std::collections::HashMap;
use std::path::Path;

use hearth_core::HearthError;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::vectors::IndexEntry;

/// Storage statistics.
///
/// # Examples
///
/// ```
/// use hearth_index::store::StoreStats;
///
/// let stats = StoreStats { total_entities: 12, total_domains: 3, index_size_bytes: 8192 };
/// assert_eq!(stats.total_domains, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Stored entities.
    pub total_entities: usize,
    /// Distinct domains among stored entities.
    pub total_domains: usize,
    /// Size of the database in bytes.
    pub index_size_bytes: u64,
}

/// SQLite-backed embedding store.
///
/// # Examples
///
/// ```
/// use hearth_index::store::EntityStore;
///
/// let store = EntityStore::in_memory().unwrap();
/// assert_eq!(store.stats().unwrap().total_entities, 0);
/// ```
pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    /// Open or create a store at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, HearthError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                HearthError::Database(format!("failed to create index directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| HearthError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, HearthError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            HearthError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), HearthError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS metadata (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entities (
                    entity_id TEXT PRIMARY KEY,
                    domain TEXT NOT NULL,
                    area_id TEXT,
                    friendly_name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    description_hash TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    indexed_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS entities_domain ON entities(domain);
                ",
            )
            .map_err(|e| HearthError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Record the embedding model and dimensionality of stored vectors.
    ///
    /// A no-op if the same values are already stored.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] if a different model or
    /// dimensionality is already recorded.
    pub fn set_embedding_model(&self, model: &str, dimensions: usize) -> Result<(), HearthError> {
        if let Some((stored_model, stored_dims)) = self.embedding_model()? {
            if stored_model != model || stored_dims != dimensions {
                return Err(HearthError::Database(format!(
                    "Index was built with {stored_model} ({stored_dims} dimensions) but config specifies \
                     {model} ({dimensions} dimensions). Re-index with --rebuild."
                )));
            }
            return Ok(());
        }

        self.set_metadata("embedding_model", model)?;
        self.set_metadata("embedding_dimensions", &dimensions.to_string())
    }

    /// The recorded embedding model and dimensionality, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on query failure or corrupted metadata.
    pub fn embedding_model(&self) -> Result<Option<(String, usize)>, HearthError> {
        let Some(model) = self.get_metadata("embedding_model")? else {
            return Ok(None);
        };
        let dims = self.get_metadata("embedding_dimensions")?.unwrap_or_default();
        let dims: usize = dims.parse().map_err(|_| {
            HearthError::Database(format!("Corrupted dimension metadata in index: '{dims}'"))
        })?;
        Ok(Some((model, dims)))
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>, HearthError> {
        let result = self.conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(HearthError::Database(format!(
                "failed to get metadata '{key}': {e}"
            ))),
        }
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<(), HearthError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| HearthError::Database(format!("failed to set metadata '{key}': {e}")))?;
        Ok(())
    }

    /// Insert or replace entries with their descriptions in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on write failure; nothing is written.
    pub fn upsert(&mut self, entries: &[(IndexEntry, String)]) -> Result<(), HearthError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| HearthError::Database(format!("failed to begin transaction: {e}")))?;
        let now = chrono::Utc::now().to_rfc3339();

        for (entry, description) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO entities
                 (entity_id, domain, area_id, friendly_name, description, description_hash,
                  embedding, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.entity_id,
                    entry.domain,
                    entry.area_id,
                    entry.friendly_name,
                    description,
                    entry.description_hash,
                    floats_to_bytes(&entry.vector),
                    now,
                ],
            )
            .map_err(|e| {
                HearthError::Database(format!("failed to store '{}': {e}", entry.entity_id))
            })?;
        }

        tx.commit()
            .map_err(|e| HearthError::Database(format!("failed to commit entities: {e}")))
    }

    /// Delete entities by id. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on delete failure.
    pub fn remove(&mut self, entity_ids: &[String]) -> Result<(), HearthError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| HearthError::Database(format!("failed to begin transaction: {e}")))?;
        for id in entity_ids {
            tx.execute("DELETE FROM entities WHERE entity_id = ?1", params![id])
                .map_err(|e| HearthError::Database(format!("failed to delete '{id}': {e}")))?;
        }
        tx.commit()
            .map_err(|e| HearthError::Database(format!("failed to commit deletes: {e}")))
    }

    /// Drop every stored entity and the recorded embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on failure.
    pub fn clear(&self) -> Result<(), HearthError> {
        self.conn
            .execute_batch(
                "DELETE FROM entities;
                 DELETE FROM metadata WHERE key IN ('embedding_model', 'embedding_dimensions');",
            )
            .map_err(|e| HearthError::Database(format!("failed to clear index: {e}")))
    }

    /// Description hash per stored entity id.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on query failure.
    pub fn description_hashes(&self) -> Result<HashMap<String, String>, HearthError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_id, description_hash FROM entities")
            .map_err(|e| HearthError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| HearthError::Database(format!("failed to query entities: {e}")))?;

        let mut hashes = HashMap::new();
        for row in rows {
            let (id, hash): (String, String) =
                row.map_err(|e| HearthError::Database(format!("failed to read row: {e}")))?;
            hashes.insert(id, hash);
        }
        Ok(hashes)
    }

    /// Load every stored entry, ordered by entity id.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on query failure.
    pub fn load_entries(&self) -> Result<Vec<IndexEntry>, HearthError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT entity_id, domain, area_id, friendly_name, description_hash, embedding
                 FROM entities ORDER BY entity_id",
            )
            .map_err(|e| HearthError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let embedding: Vec<u8> = row.get(5)?;
                Ok(IndexEntry {
                    entity_id: row.get(0)?,
                    domain: row.get(1)?,
                    area_id: row.get(2)?,
                    friendly_name: row.get(3)?,
                    description_hash: row.get(4)?,
                    vector: bytes_to_floats(&embedding),
                })
            })
            .map_err(|e| HearthError::Database(format!("failed to query entities: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| HearthError::Database(format!("failed to read row: {e}")))?);
        }
        Ok(entries)
    }

    /// Storage statistics.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, HearthError> {
        let total_entities: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
            .map_err(|e| HearthError::Database(format!("failed to count entities: {e}")))?;

        let total_domains: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT domain) FROM entities", [], |row| row.get(0))
            .map_err(|e| HearthError::Database(format!("failed to count domains: {e}")))?;

        let page_count: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(StoreStats {
            total_entities: total_entities as usize,
            total_domains: total_domains as usize,
            index_size_bytes: (page_count * page_size) as u64,
        })
    }
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    floats.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, hash: &str, vector: Vec<f32>) -> (IndexEntry, String) {
        let domain = id.split_once('.').map_or(id, |(d, _)| d).to_string();
        (
            IndexEntry {
                entity_id: id.into(),
                domain,
                area_id: Some("kitchen".into()),
                friendly_name: format!("Name of {id}"),
                description_hash: hash.into(),
                vector,
            },
            format!("description of {id}"),
        )
    }

    #[test]
    fn upsert_and_load() {
        let mut store = EntityStore::in_memory().unwrap();
        store
            .upsert(&[
                entry("switch.fan", "h2", vec![0.0, 1.0]),
                entry("light.kitchen", "h1", vec![1.0, -2.5]),
            ])
            .unwrap();

        let entries = store.load_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entity_id, "light.kitchen");
        assert_eq!(entries[0].vector, vec![1.0, -2.5]);
        assert_eq!(entries[0].area_id.as_deref(), Some("kitchen"));
        assert_eq!(entries[1].domain, "switch");
    }

    #[test]
    fn upsert_replaces_existing_entity() {
        let mut store = EntityStore::in_memory().unwrap();
        store.upsert(&[entry("light.a", "old", vec![1.0])]).unwrap();
        store.upsert(&[entry("light.a", "new", vec![2.0])]).unwrap();

        let hashes = store.description_hashes().unwrap();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes["light.a"], "new");
    }

    #[test]
    fn remove_deletes_only_named_entities() {
        let mut store = EntityStore::in_memory().unwrap();
        store
            .upsert(&[entry("light.a", "1", vec![1.0]), entry("light.b", "2", vec![1.0])])
            .unwrap();
        store
            .remove(&["light.a".to_string(), "light.zzz".to_string()])
            .unwrap();

        let hashes = store.description_hashes().unwrap();
        assert!(!hashes.contains_key("light.a"));
        assert!(hashes.contains_key("light.b"));
    }

    #[test]
    fn stats_are_correct() {
        let mut store = EntityStore::in_memory().unwrap();
        store
            .upsert(&[
                entry("light.a", "1", vec![1.0]),
                entry("light.b", "2", vec![1.0]),
                entry("sensor.c", "3", vec![1.0]),
            ])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.total_domains, 2);
        assert!(stats.index_size_bytes > 0);
    }

    #[test]
    fn embedding_model_is_stored_and_validated() {
        let store = EntityStore::in_memory().unwrap();
        assert_eq!(store.embedding_model().unwrap(), None);

        store.set_embedding_model("voyage-3-lite", 512).unwrap();
        assert_eq!(
            store.embedding_model().unwrap(),
            Some(("voyage-3-lite".to_string(), 512))
        );
        store.set_embedding_model("voyage-3-lite", 512).unwrap();

        let err = store.set_embedding_model("hash-256", 256).unwrap_err().to_string();
        assert!(err.contains("voyage-3-lite"));
        assert!(err.contains("256"));
        assert!(err.contains("--rebuild"));
    }

    #[test]
    fn clear_forgets_entities_and_model() {
        let mut store = EntityStore::in_memory().unwrap();
        store.set_embedding_model("m", 1).unwrap();
        store.upsert(&[entry("light.a", "1", vec![1.0])]).unwrap();

        store.clear().unwrap();
        assert!(store.load_entries().unwrap().is_empty());
        assert_eq!(store.embedding_model().unwrap(), None);
        store.set_embedding_model("other", 4).unwrap();
    }

    #[test]
    fn reopened_store_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        {
            let mut store = EntityStore::open(&path).unwrap();
            store.upsert(&[entry("light.a", "1", vec![0.5, 0.25])]).unwrap();
        }
        let store = EntityStore::open(&path).unwrap();
        assert_eq!(store.load_entries().unwrap()[0].vector, vec![0.5, 0.25]);
    }

    #[test]
    fn floats_bytes_roundtrip() {
        let original = vec![1.0f32, -2.5, 0.0, 3.25];
        assert_eq!(bytes_to_floats(&floats_to_bytes(&original)), original);
    }
}
