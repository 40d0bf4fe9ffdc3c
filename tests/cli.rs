use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
#[allow(deprecated)]
fn test_normalize_collapses_blank_lines() {
    let mut cmd = assert_cmd::Command::cargo_bin("beditor").unwrap();
    cmd.arg("normalize").write_stdin("a\n\n\n\n2. b\n");

    cmd.assert().success().stdout("a\n\n1. b\n");
}

#[test]
#[allow(deprecated)]
fn test_normalize_accepts_quote_sources() {
    let dir = tempdir().unwrap();
    let quotes = dir.path().join("quotes.json");
    fs::write(&quotes, r#"[{"username": "sam", "avatarURL": "http://a/sam.png"}]"#).unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("beditor").unwrap();
    cmd.arg("normalize")
        .arg("--quotes")
        .arg(&quotes)
        .write_stdin("[quote=\"sam\"]\nhi\n[/quote]");

    cmd.assert()
        .success()
        .stdout("[quote=\"sam\" src=\"\"]\nhi\n[/quote]\n");
}

#[test]
#[allow(deprecated)]
fn test_replay_script() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.json");
    fs::write(
        &script,
        r#"[
            {"action": "text", "text": "Hello"},
            {"action": "key", "command": "bold"},
            {"action": "text", "text": " world"},
            {"action": "key", "command": "split-block"},
            {"action": "blockType", "type": "unordered-list-item"},
            {"action": "text", "text": "item"}
        ]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(&script);

    cmd.assert()
        .success()
        .stdout("Hello** world**\n\n- item\n");
}

#[test]
#[allow(deprecated)]
fn test_replay_continues_from_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("draft.md");
    let script = dir.path().join("script.json");
    fs::write(&input, "[quote=\"sam\"]\nhi\n[/quote]").unwrap();
    fs::write(
        &script,
        r#"[
            {"action": "text", "text": "reply"},
            {"action": "select", "block": 1, "offset": 0, "focusOffset": 5},
            {"action": "link", "url": "http://x"}
        ]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(&script).arg("--input").arg(&input);

    cmd.assert().success().stdout(
        "[quote=\"sam\" src=\"\"]\nhi\n[/quote]\n\n[reply](http://x)\n",
    );
}

#[test]
#[allow(deprecated)]
fn test_replay_json_output() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.json");
    fs::write(
        &script,
        r#"[{"action": "event", "name": "imageadd", "payload": {"src": "cat.png"}}]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(&script).arg("--json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let blocks = json.get("blocks").unwrap().as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].get("text").unwrap(), "image");
    assert_eq!(blocks[0].get("type").unwrap(), "unstyled");
    let ranges = blocks[0].get("entityRanges").unwrap().as_array().unwrap();
    assert_eq!(ranges.len(), 1);
    let entity_map = json.get("entityMap").unwrap().as_object().unwrap();
    let entity = entity_map.values().next().unwrap();
    assert_eq!(entity.get("type").unwrap(), "IMAGE");
    assert_eq!(entity.get("mutability").unwrap(), "IMMUTABLE");
    assert_eq!(entity.get("data").unwrap().get("src").unwrap(), "cat.png");
}

#[test]
#[allow(deprecated)]
fn test_replay_rejects_unknown_style() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.json");
    fs::write(&script, r#"[{"action": "style", "style": "SHOUTY"}]"#).unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(&script);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown style SHOUTY"));
}

#[test]
#[allow(deprecated)]
fn test_replay_rejects_duplicate_plugins() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.json");
    let config = dir.path().join("config.json");
    fs::write(&script, "[]").unwrap();
    fs::write(&config, r#"{"plugins": ["core", "link", "core"]}"#).unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(&script).arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("listed twice"));
}

#[test]
#[allow(deprecated)]
fn test_replay_missing_script() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("beditor").unwrap();
    cmd.arg("replay").arg(dir.path().join("missing.json"));

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"));
}
