use std::fs;
use std::path::PathBuf;

use chat_context::{Role, Turn};
use serde_json::{json, Value};
use session_store::{
    session_root, SessionState, SessionStore, SessionStoreError, DEFAULT_MAX_CTX_CHARS,
    DEFAULT_MODE, DEFAULT_TEMPERATURE,
};
use tempfile::TempDir;

fn temp_store() -> (TempDir, SessionStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = SessionStore::new(session_root(dir.path()));
    (dir, store)
}

fn write_raw(store: &SessionStore, file_name: &str, contents: &str) -> PathBuf {
    fs::create_dir_all(store.root()).expect("session dir should be created");
    let path = store.root().join(file_name);
    fs::write(&path, contents).expect("session file should be written");
    path
}

fn sample_state() -> SessionState {
    let mut state = SessionState::new("20260214-081530");
    state.mode = "coding".to_owned();
    state.temperature = 0.2;
    state.max_ctx_chars = 8000;
    state.turns = vec![Turn::user("hi"), Turn::assistant("hello there")];
    state
}

#[test]
fn save_then_load_round_trips_state() {
    let (_dir, store) = temp_store();
    let state = sample_state();

    let path = store.save(&state).expect("save should succeed");
    assert_eq!(path, store.root().join("20260214-081530.json"));

    let loaded = store.load("20260214-081530").expect("load should succeed");
    assert_eq!(loaded.state, state);
    assert_eq!(loaded.path, path);
    assert!(loaded.saved_at.is_some());
}

#[test]
fn save_writes_pretty_json_with_expected_fields() {
    let (_dir, store) = temp_store();
    let path = store.save(&sample_state()).expect("save should succeed");

    let text = fs::read_to_string(&path).expect("file should be readable");
    assert!(text.contains("\n  \"session_id\""), "expected indented JSON: {text}");

    let value: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["session_id"], "20260214-081530");
    assert_eq!(value["mode"], "coding");
    assert_eq!(value["max_ctx_chars"], 8000);
    assert_eq!(
        value["turns"],
        json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello there"},
        ])
    );
    let saved_at = value["saved_at"].as_str().expect("saved_at string");
    assert!(saved_at.ends_with('Z'), "saved_at should be UTC RFC 3339: {saved_at}");
}

#[test]
fn save_replaces_existing_file_and_leaves_no_temp_files() {
    let (_dir, store) = temp_store();
    let mut state = sample_state();
    store.save(&state).expect("first save");

    state.turns.push(Turn::user("again"));
    store.save(&state).expect("second save");

    let loaded = store.load(&state.session_id).expect("load");
    assert_eq!(loaded.state.turns.len(), 3);

    let names: Vec<String> = fs::read_dir(store.root())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["20260214-081530.json".to_string()]);
}

#[test]
fn load_missing_session_is_not_found() {
    let (_dir, store) = temp_store();

    let error = store.load("20990101-000000").expect_err("missing file must fail");
    assert!(error.is_not_found());
    assert!(matches!(
        error,
        SessionStoreError::NotFound { ref session_id, .. } if session_id == "20990101-000000"
    ));
}

#[test]
fn load_corrupt_json_is_reported() {
    let (_dir, store) = temp_store();
    write_raw(&store, "broken.json", "{ not json");

    let error = store.load("broken").expect_err("corrupt file must fail");
    assert!(matches!(error, SessionStoreError::Corrupt { .. }));
}

#[test]
fn load_requires_session_id_field() {
    let (_dir, store) = temp_store();
    write_raw(&store, "anon.json", r#"{"mode": "tutor", "turns": []}"#);

    let error = store.load("anon").expect_err("session_id is required");
    assert!(matches!(error, SessionStoreError::Corrupt { .. }));
}

#[test]
fn load_rejects_unknown_role() {
    let (_dir, store) = temp_store();
    write_raw(
        &store,
        "roles.json",
        r#"{"session_id": "roles", "turns": [{"role": "tool", "content": "x"}]}"#,
    );

    let error = store.load("roles").expect_err("unknown role must fail");
    assert!(matches!(error, SessionStoreError::Corrupt { .. }));
}

#[test]
fn load_fills_defaults_for_missing_fields() {
    let (_dir, store) = temp_store();
    write_raw(&store, "minimal.json", r#"{"session_id": "minimal"}"#);

    let loaded = store.load("minimal").expect("minimal file should load");
    assert_eq!(loaded.state.mode, DEFAULT_MODE);
    assert_eq!(loaded.state.temperature, DEFAULT_TEMPERATURE);
    assert_eq!(loaded.state.max_ctx_chars, DEFAULT_MAX_CTX_CHARS);
    assert!(loaded.state.turns.is_empty());
    assert!(loaded.saved_at.is_none());
}

#[test]
fn load_clamps_out_of_range_settings() {
    let (_dir, store) = temp_store();
    write_raw(
        &store,
        "wild.json",
        r#"{"session_id": "wild", "temperature": 9.5, "max_ctx_chars": 100}"#,
    );

    let loaded = store.load("wild").expect("load");
    assert_eq!(loaded.state.temperature, 2.0);
    assert_eq!(loaded.state.max_ctx_chars, 2000);
}

#[test]
fn load_accepts_legacy_saved_at() {
    let (_dir, store) = temp_store();
    write_raw(
        &store,
        "20250101-120000.json",
        r#"{
  "session_id": "20250101-120000",
  "mode": "snark",
  "temperature": 0.9,
  "max_ctx_chars": 12000,
  "turns": [{"role": "user", "content": "hey"}],
  "saved_at": "2025-01-01 12:00:00"
}"#,
    );

    let loaded = store.load("20250101-120000").expect("legacy file should load");
    let saved_at = loaded.saved_at.expect("saved_at parsed");
    assert_eq!(saved_at.unix_timestamp(), 1_735_732_800);
    assert_eq!(loaded.state.turns[0].role, Role::User);
}

#[test]
fn load_rejects_unparsable_saved_at() {
    let (_dir, store) = temp_store();
    write_raw(
        &store,
        "when.json",
        r#"{"session_id": "when", "saved_at": "last tuesday"}"#,
    );

    let error = store.load("when").expect_err("bad timestamp must fail");
    assert!(matches!(error, SessionStoreError::Corrupt { .. }));
}

#[test]
fn ids_with_path_components_are_rejected() {
    let (_dir, store) = temp_store();

    for id in ["../escape", "nested/id", "..", ""] {
        let error = store.load(id).expect_err("unsafe id must fail");
        assert!(
            matches!(error, SessionStoreError::InvalidSessionId { .. }),
            "{id:?}: {error:?}"
        );
    }

    let state = SessionState::new("../escape");
    assert!(matches!(
        store.save(&state),
        Err(SessionStoreError::InvalidSessionId { .. })
    ));
}

#[test]
fn list_returns_ids_newest_first() {
    let (_dir, store) = temp_store();
    for id in ["20260101-000000", "20260301-000000", "20260201-000000"] {
        store.save(&SessionState::new(id)).expect("save");
    }
    write_raw(&store, "notes.txt", "not a session");
    write_raw(&store, ".partial.tmp", "");

    let ids = store.list().expect("list");
    assert_eq!(
        ids,
        vec!["20260301-000000", "20260201-000000", "20260101-000000"]
    );
}

#[test]
fn list_without_directory_is_empty() {
    let (_dir, store) = temp_store();
    assert!(!store.root().exists());
    assert_eq!(store.list().expect("list"), Vec::<String>::new());
}
