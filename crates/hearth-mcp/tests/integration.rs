use std::sync::Arc;

use hearth_core::{EntityRecord, SearchConfig};
use hearth_hass::StaticSnapshot;
use hearth_index::{EntityStore, HashEmbedder, Indexer, VectorIndex};
use hearth_mcp::tools::{HearthServer, ReindexEntitiesParams, SearchEntitiesParams};
use rmcp::{handler::server::wrapper::Parameters, model::*, ServerHandler};

fn house() -> Vec<EntityRecord> {
    vec![
        EntityRecord::new("light.living_room", "on")
            .with_attribute("friendly_name", "Living Room Lights")
            .with_attribute("area_id", "living_room")
            .with_attribute("brightness", 200),
        EntityRecord::new("light.kitchen", "off")
            .with_attribute("friendly_name", "Kitchen Lights")
            .with_attribute("area_id", "kitchen"),
        EntityRecord::new("sensor.kitchen_temperature", "21.5")
            .with_attribute("friendly_name", "Kitchen Temperature")
            .with_attribute("area_id", "kitchen")
            .with_attribute("device_class", "temperature")
            .with_attribute("unit_of_measurement", "°C"),
        EntityRecord::new("cover.garage_door", "closed")
            .with_attribute("friendly_name", "Garage Door"),
    ]
}

fn server_with(store: EntityStore) -> HearthServer {
    let indexer = Indexer::new(
        store,
        Arc::new(HashEmbedder::new(256).unwrap()),
        Arc::new(VectorIndex::new()),
    );
    HearthServer::new(
        Arc::new(StaticSnapshot::new(house())),
        Arc::new(indexer),
        SearchConfig::default(),
    )
}

fn test_server() -> HearthServer {
    server_with(EntityStore::in_memory().unwrap())
}

fn extract_text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(t) => &t.text,
        _ => panic!("expected text content"),
    }
}

fn parse(result: &CallToolResult) -> serde_json::Value {
    serde_json::from_str(extract_text(result)).unwrap()
}

async fn search(server: &HearthServer, params: SearchEntitiesParams) -> serde_json::Value {
    let result = server.search_entities(Parameters(params)).await.unwrap();
    parse(&result)
}

async fn reindex(server: &HearthServer, rebuild: bool) -> serde_json::Value {
    let params = ReindexEntitiesParams {
        rebuild: Some(rebuild),
    };
    let result = server.reindex_entities(Parameters(params)).await.unwrap();
    parse(&result)
}

#[test]
fn server_info_is_correct() {
    let server = test_server();
    let info = server.get_info();

    assert_eq!(info.server_info.name, "hearth");
    assert_eq!(info.server_info.version, "0.1.0");
    let instructions = info.instructions.unwrap();
    assert!(instructions.contains("search_entities"));
    assert!(instructions.contains("reindex_entities"));
    assert!(instructions.contains("index_status"));
    assert!(instructions.contains("area_id"));
}

#[tokio::test]
async fn server_without_index_still_searches_by_keyword() {
    let server = HearthServer::without_index(
        Arc::new(StaticSnapshot::new(house())),
        SearchConfig::default(),
        "No API key configured for embedding provider 'voyage'",
    );

    let body = search(
        &server,
        SearchEntitiesParams {
            query: "garage".into(),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["results"][0]["entity_id"], "cover.garage_door");

    let err = server.index_status().await.unwrap_err();
    assert!(err.message.contains("voyage"));
    let params = ReindexEntitiesParams { rebuild: None };
    assert!(server.reindex_entities(Parameters(params)).await.is_err());
}

#[tokio::test]
async fn area_filter_only_matches_area_id_attribute() {
    let server = test_server();
    let body = search(
        &server,
        SearchEntitiesParams {
            query: "garage".into(),
            area_id: Some("garage".into()),
            search_mode: Some("keyword".into()),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn unindexed_server_falls_back_to_keyword() {
    let server = test_server();
    let body = search(
        &server,
        SearchEntitiesParams {
            query: "kitchen".into(),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["count"], 2);
    let reason = body["results"][0]["match_reason"].as_str().unwrap();
    assert!(reason.starts_with("Keyword match: 'kitchen'"));
    assert!(reason.contains("semantic search failed"));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn indexed_server_answers_semantically() {
    let server = test_server();
    let report = reindex(&server, false).await;
    assert_eq!(report["embedded"], 4);
    assert_eq!(report["total"], 4);

    let body = search(
        &server,
        SearchEntitiesParams {
            query: "living room lights".into(),
            search_mode: Some("semantic".into()),
            similarity_threshold: Some(0.0),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(body["search_mode"], "semantic");
    assert_eq!(body["results"][0]["entity_id"], "light.living_room");
    assert_eq!(body["results"][0]["state"], "on");
    assert_eq!(body["results"][0]["brightness"], 200);
    assert!(body["results"][0]["match_reason"]
        .as_str()
        .unwrap()
        .contains("% similarity"));
}

#[tokio::test]
async fn invalid_mode_is_reported_in_the_body() {
    let server = test_server();
    let body = search(
        &server,
        SearchEntitiesParams {
            query: "lights".into(),
            search_mode: Some("fuzzy".into()),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(body["search_mode"], "fuzzy");
    assert_eq!(body["count"], 0);
    assert!(body["error"].as_str().unwrap().contains("fuzzy"));
}

#[tokio::test]
async fn domain_filter_applies_to_results() {
    let server = test_server();
    reindex(&server, false).await;
    let body = search(
        &server,
        SearchEntitiesParams {
            query: "kitchen".into(),
            domain: Some("sensor".into()),
            similarity_threshold: Some(0.0),
            ..Default::default()
        },
    )
    .await;

    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r["domain"] == "sensor"));
    assert_eq!(body["domains"]["sensor"], results.len());
}

#[tokio::test]
async fn index_status_reflects_reindex() {
    let server = test_server();

    let result = server.index_status().await.unwrap();
    let before = parse(&result);
    assert_eq!(before["version"], 0);
    assert_eq!(before["entities"], 0);

    reindex(&server, false).await;
    let result = server.index_status().await.unwrap();
    let after = parse(&result);
    assert_eq!(after["entities"], 4);
    assert_eq!(after["dimensions"], 256);
    assert_eq!(after["model"], "hash-256");
    assert_eq!(after["domains"]["light"], 2);
}

#[tokio::test]
async fn second_reindex_reuses_stored_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let store = EntityStore::open(&dir.path().join("index.db")).unwrap();
    let server = server_with(store);

    let first = reindex(&server, false).await;
    assert_eq!(first["embedded"], 4);

    let second = reindex(&server, false).await;
    assert_eq!(second["embedded"], 0);
    assert_eq!(second["unchanged"], 4);
    assert_eq!(second["rebuilt"], false);

    let rebuilt = reindex(&server, true).await;
    assert_eq!(rebuilt["embedded"], 4);
    assert_eq!(rebuilt["rebuilt"], true);
}
