use std::sync::Arc;

use hearth_core::EntityRecord;
use hearth_index::{Embedder, EntityStore, HashEmbedder, Indexer, NearestFilter, VectorIndex};

fn house() -> Vec<EntityRecord> {
    vec![
        EntityRecord::new("light.living_room", "on")
            .with_attribute("friendly_name", "Living Room Lights")
            .with_attribute("area_id", "living_room"),
        EntityRecord::new("light.bedroom", "off")
            .with_attribute("friendly_name", "Bedroom Lamp")
            .with_attribute("area_id", "bedroom"),
        EntityRecord::new("sensor.outdoor_temperature", "12.5")
            .with_attribute("friendly_name", "Outdoor Temperature")
            .with_attribute("device_class", "temperature")
            .with_attribute("unit_of_measurement", "°C"),
        EntityRecord::new("cover.garage_door", "closed")
            .with_attribute("friendly_name", "Garage Door")
            .with_attribute("device_class", "garage"),
    ]
}

#[tokio::test]
async fn indexed_house_answers_queries_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join(".hearth").join("index.db");
    let embedder = Arc::new(HashEmbedder::new(256).unwrap());

    let first = Indexer::new(
        EntityStore::open(&db).unwrap(),
        embedder.clone(),
        Arc::new(VectorIndex::new()),
    );
    let report = first.sync(&house(), false).await.unwrap();
    assert_eq!(report.embedded, 4);
    drop(first);

    let index = Arc::new(VectorIndex::new());
    let restarted = Indexer::new(EntityStore::open(&db).unwrap(), embedder.clone(), index.clone());
    restarted.load().unwrap();

    let query = embedder.embed_query("outdoor temperature").await.unwrap();
    let hits = index
        .snapshot()
        .nearest(&query, 2, NearestFilter::default())
        .unwrap();
    assert_eq!(hits[0].entity_id, "sensor.outdoor_temperature");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn area_filter_limits_neighbours() {
    let embedder = Arc::new(HashEmbedder::new(128).unwrap());
    let index = Arc::new(VectorIndex::new());
    Indexer::new(EntityStore::in_memory().unwrap(), embedder.clone(), index.clone())
        .sync(&house(), false)
        .await
        .unwrap();

    let query = embedder.embed_query("lights").await.unwrap();
    let filter = NearestFilter {
        domain: Some("light"),
        area: Some("bedroom"),
    };
    let hits = index.snapshot().nearest(&query, 10, filter).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity_id, "light.bedroom");
    assert_eq!(index.snapshot().status().domains.len(), 3);
}
