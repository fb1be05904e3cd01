//! The snapshot provider trait and the in-memory implementation.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use hearth_core::{EntityRecord, HearthError, RetrievalFailure};
use serde_json::Value;

/// Read access to the current set of Home Assistant entities.
///
/// Implementations must be cheap to share across concurrent requests.
#[async_trait]
pub trait EntitySnapshotProvider: Send + Sync {
    /// List entities, optionally restricted to `domain` and to entities
    /// matching `search_query` as a case-insensitive substring.
    ///
    /// An empty or absent query lists everything. Results are ordered by
    /// entity id and hold at most `limit` records.
    async fn list_entities(
        &self,
        domain: Option<&str>,
        search_query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EntityRecord>, RetrievalFailure>;

    /// Fetch the records for the given entity ids. Unknown ids are skipped.
    async fn entities_by_id(&self, ids: &[String]) -> Result<Vec<EntityRecord>, RetrievalFailure> {
        let all = self.list_entities(None, None, usize::MAX).await?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(all
            .into_iter()
            .filter(|record| wanted.contains(record.entity_id.as_str()))
            .collect())
    }
}

/// Whether `record` matches `query` as a case-insensitive substring of its
/// entity id, friendly name, or any attribute value.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityRecord;
/// use hearth_hass::matches_keyword;
///
/// let lamp = EntityRecord::new("light.desk", "off").with_attribute("friendly_name", "Desk Lamp");
/// assert!(matches_keyword(&lamp, "lamp"));
/// assert!(matches_keyword(&lamp, "LIGHT.DE"));
/// assert!(!matches_keyword(&lamp, "kitchen"));
/// ```
pub fn matches_keyword(record: &EntityRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    if record.entity_id.to_lowercase().contains(&needle)
        || record.friendly_name().to_lowercase().contains(&needle)
    {
        return true;
    }

    record
        .attributes
        .values()
        .any(|value| attribute_text(value).is_some_and(|text| text.to_lowercase().contains(&needle)))
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Apply the listing contract (domain, substring, order, limit) to a set of
/// records.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityRecord;
/// use hearth_hass::select_entities;
///
/// let entities = vec![
///     EntityRecord::new("switch.fan", "on"),
///     EntityRecord::new("light.b", "on"),
///     EntityRecord::new("light.a", "off"),
/// ];
/// let lights = select_entities(entities, Some("light"), None, 10);
/// let ids: Vec<_> = lights.iter().map(|e| e.entity_id.as_str()).collect();
/// assert_eq!(ids, ["light.a", "light.b"]);
/// ```
pub fn select_entities(
    entities: impl IntoIterator<Item = EntityRecord>,
    domain: Option<&str>,
    search_query: Option<&str>,
    limit: usize,
) -> Vec<EntityRecord> {
    let query = search_query.map(str::trim).filter(|q| !q.is_empty());

    let mut selected: Vec<EntityRecord> = entities
        .into_iter()
        .filter(|record| domain.map_or(true, |d| record.domain() == d))
        .filter(|record| query.map_or(true, |q| matches_keyword(record, q)))
        .collect();

    selected.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    selected.truncate(limit);
    selected
}

/// A fixed, in-memory entity snapshot.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityRecord;
/// use hearth_hass::StaticSnapshot;
///
/// let snapshot = StaticSnapshot::new(vec![EntityRecord::new("sun.sun", "above_horizon")]);
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshot {
    entities: Vec<EntityRecord>,
}

impl StaticSnapshot {
    /// Wrap a list of records.
    pub fn new(entities: Vec<EntityRecord>) -> Self {
        Self { entities }
    }

    /// Parse a `GET /api/states` response body.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Serialization`] if the JSON is not an array of
    /// state objects.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_hass::StaticSnapshot;
    ///
    /// let snapshot = StaticSnapshot::from_json(r#"[{"entity_id": "light.a", "state": "on"}]"#).unwrap();
    /// assert_eq!(snapshot.entities()[0].entity_id, "light.a");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, HearthError> {
        let entities: Vec<EntityRecord> = serde_json::from_str(json)?;
        Ok(Self::new(entities))
    }

    /// Load a saved states dump from disk.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::FileNotFound`] if the file is missing, or a
    /// parse error if its content is not a states array.
    pub fn from_file(path: &Path) -> Result<Self, HearthError> {
        if !path.exists() {
            return Err(HearthError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// All records in the snapshot.
    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[async_trait]
impl EntitySnapshotProvider for StaticSnapshot {
    async fn list_entities(
        &self,
        domain: Option<&str>,
        search_query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EntityRecord>, RetrievalFailure> {
        Ok(select_entities(
            self.entities.iter().cloned(),
            domain,
            search_query,
            limit,
        ))
    }

    async fn entities_by_id(&self, ids: &[String]) -> Result<Vec<EntityRecord>, RetrievalFailure> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .entities
            .iter()
            .filter(|record| wanted.contains(record.entity_id.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn home() -> StaticSnapshot {
        StaticSnapshot::new(vec![
            EntityRecord::new("light.living_room", "on")
                .with_attribute("friendly_name", "Living Room Lights")
                .with_attribute("brightness", 200),
            EntityRecord::new("light.kitchen", "off").with_attribute("friendly_name", "Kitchen"),
            EntityRecord::new("sensor.kitchen_temperature", "21.4")
                .with_attribute("friendly_name", "Kitchen Temperature")
                .with_attribute("unit_of_measurement", "°C"),
            EntityRecord::new("switch.garden_pump", "off")
                .with_attribute("friendly_name", "Garden Pump")
                .with_attribute("device_class", "outlet"),
        ])
    }

    #[test]
    fn keyword_matches_attribute_values() {
        let home = home();
        let pump = &home.entities()[3];
        assert!(matches_keyword(pump, "outlet"));
        assert!(matches_keyword(pump, "  garden "));
        assert!(!matches_keyword(pump, "kitchen"));
    }

    #[test]
    fn keyword_matches_numeric_attributes_as_text() {
        let home = home();
        let lamp = &home.entities()[0];
        assert!(matches_keyword(lamp, "200"));
    }

    #[test]
    fn keyword_ignores_null_attributes() {
        let record = EntityRecord::new("cover.door", "closed").with_attribute("icon", json!(null));
        assert!(!matches_keyword(&record, "null"));
    }

    #[tokio::test]
    async fn list_all_is_sorted_and_limited() {
        let listed = home().list_entities(None, None, 3).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(
            ids,
            ["light.kitchen", "light.living_room", "sensor.kitchen_temperature"]
        );
    }

    #[tokio::test]
    async fn list_filters_by_domain_and_query() {
        let listed = home()
            .list_entities(Some("sensor"), Some("kitchen"), 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entity_id, "sensor.kitchen_temperature");
    }

    #[tokio::test]
    async fn blank_query_lists_everything() {
        let listed = home().list_entities(None, Some("   "), 10).await.unwrap();
        assert_eq!(listed.len(), 4);
    }

    #[tokio::test]
    async fn entities_by_id_skips_unknown_ids() {
        let ids = vec!["switch.garden_pump".to_string(), "light.nowhere".to_string()];
        let found = home().entities_by_id(&ids).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].friendly_name(), "Garden Pump");
    }

    #[test]
    fn from_json_rejects_non_array() {
        assert!(StaticSnapshot::from_json(r#"{"entity_id": "light.a"}"#).is_err());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = StaticSnapshot::from_file(Path::new("/nonexistent/states.json")).unwrap_err();
        assert!(matches!(err, HearthError::FileNotFound(_)));
    }
}
