use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_hearth"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "hearth init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".hearth.toml");
    assert!(config_path.exists(), ".hearth.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[hass]"));
    assert!(content.contains("[embedding]"));
    assert!(content.contains("[search]"));

    // Every option is commented out, so the template parses to the defaults.
    let config: hearth_core::HearthConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.search.default_limit, 10);
    assert_eq!(config.embedding.provider, "hash");
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".hearth.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_hearth"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".hearth.toml")).unwrap();
    assert_eq!(content, "# existing");
}
