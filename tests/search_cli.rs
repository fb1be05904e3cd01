use std::path::Path;
use std::process::{Command, Output};

const STATES: &str = r#"[
  {"entity_id": "light.kitchen", "state": "on",
   "attributes": {"friendly_name": "Kitchen Lights", "area_id": "kitchen", "brightness": 180}},
  {"entity_id": "light.porch", "state": "off",
   "attributes": {"friendly_name": "Porch Light"}},
  {"entity_id": "switch.kitchen_fan", "state": "off",
   "attributes": {"friendly_name": "Kitchen Fan", "area_id": "kitchen"}}
]"#;

fn hearth(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hearth"))
        .args(args)
        .current_dir(dir)
        .env_remove("HASS_TOKEN")
        .env_remove("HASS_URL")
        .env_remove("VOYAGE_API_KEY")
        .output()
        .unwrap()
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "hearth failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("states.json"), STATES).unwrap();
    dir
}

#[test]
fn keyword_search_over_states_dump() {
    let dir = workspace();
    let output = hearth(
        dir.path(),
        &["search", "kitchen", "--mode", "keyword", "--snapshot", "states.json", "--format", "json"],
    );
    let body = json_stdout(&output);

    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["entity_id"], "light.kitchen");
    assert_eq!(body["results"][0]["brightness"], 180);
    assert_eq!(body["results"][1]["entity_id"], "switch.kitchen_fan");
}

fn voyage_workspace() -> tempfile::TempDir {
    let dir = workspace();
    std::fs::write(
        dir.path().join(".hearth.toml"),
        "[embedding]\nprovider = \"voyage\"\nmodel = \"voyage-3\"\n",
    )
    .unwrap();
    dir
}

#[test]
fn keyword_search_needs_no_embedding_key() {
    let dir = voyage_workspace();
    let output = hearth(
        dir.path(),
        &["search", "kitchen", "--mode", "keyword", "--snapshot", "states.json", "--format", "json"],
    );
    let body = json_stdout(&output);

    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["count"], 2);
    assert!(!dir.path().join(".hearth/index.db").exists());
}

#[test]
fn hybrid_search_without_embedding_key_uses_keywords() {
    let dir = voyage_workspace();
    let output = hearth(
        dir.path(),
        &["search", "kitchen", "--snapshot", "states.json", "--format", "json"],
    );
    let body = json_stdout(&output);

    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["count"], 2);
    let reason = body["results"][0]["match_reason"].as_str().unwrap();
    assert!(reason.contains("No API key configured for embedding provider 'voyage'"));
}

#[test]
fn missing_embedding_key_names_the_env_var() {
    let dir = voyage_workspace();
    let output = hearth(dir.path(), &["index", "--snapshot", "states.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Set VOYAGE_API_KEY"), "stderr: {stderr}");
    assert!(!stderr.contains("{env_var}"));
}

#[test]
fn unindexed_hybrid_search_falls_back_to_keyword() {
    let dir = workspace();
    let output = hearth(
        dir.path(),
        &["search", "porch", "--snapshot", "states.json", "--format", "json"],
    );
    let body = json_stdout(&output);

    assert_eq!(body["search_mode"], "keyword");
    assert_eq!(body["results"][0]["entity_id"], "light.porch");
}

#[test]
fn index_then_semantic_search() {
    let dir = workspace();
    let output = hearth(
        dir.path(),
        &["index", "--snapshot", "states.json", "--format", "json"],
    );
    let report = json_stdout(&output);
    assert_eq!(report["embedded"], 3);
    assert!(dir.path().join(".hearth/index.db").exists());

    let output = hearth(
        dir.path(),
        &[
            "search", "kitchen lights", "--mode", "semantic", "--threshold", "0",
            "--snapshot", "states.json", "--format", "json",
        ],
    );
    let body = json_stdout(&output);
    assert_eq!(body["search_mode"], "semantic");
    assert_eq!(body["results"][0]["entity_id"], "light.kitchen");
}

#[test]
fn invalid_mode_exits_with_error_body() {
    let dir = workspace();
    let output = hearth(
        dir.path(),
        &["search", "fan", "--mode", "fuzzy", "--snapshot", "states.json", "--format", "json"],
    );

    assert!(!output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["search_mode"], "fuzzy");
    assert_eq!(body["count"], 0);
}

#[test]
fn live_search_without_token_is_rejected() {
    let dir = workspace();
    let output = hearth(dir.path(), &["search", "kitchen"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("token"));
}
