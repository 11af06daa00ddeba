//! Runs the real binary, offline, with a fast tick.

use std::io::Write;
use std::process::{Command, Stdio};

fn wybe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wybe"));
    cmd.env("WYBE_TICK_MS", "1")
        .env_remove("WYBE_CONFIG")
        .env_remove("WYBE_STATE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_flags() {
    let out = wybe().arg("--help").output().unwrap();
    assert!(out.status.success());
    let help = String::from_utf8_lossy(&out.stdout);
    for flag in ["--config", "--state", "--offline", "--ticks", "--log-json"] {
        assert!(help.contains(flag), "missing {flag}");
    }
}

#[test]
fn test_version() {
    let out = wybe().arg("--version").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("wybe"));
}

#[test]
fn test_offline_conversation_and_state_saved() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    let mut child = wybe()
        .args(["--offline", "--ticks", "300", "--config"])
        .arg(dir.path().join("missing.toml"))
        .arg("--state")
        .arg(&state)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"hello there\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("I heard: hello there"), "stdout: {stdout}");

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert!(saved["state"]["valence"].is_number());
}

#[test]
fn test_resumes_from_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(
        &state,
        r#"{"state": {"valence": 0.5, "arousal": 0.3, "confidence": 0.5,
                      "energy": 0.7, "social": 0.4, "curiosity": 0.6},
            "saved_at": "2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let out = wybe()
        .args(["--offline", "--ticks", "5", "--config"])
        .arg(dir.path().join("missing.toml"))
        .arg("--state")
        .arg(&state)
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(out.status.success());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    let valence = saved["state"]["valence"].as_f64().unwrap();
    assert!((valence - 0.5).abs() < 0.05, "valence {valence}");
}

#[test]
fn test_invalid_saved_state_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(&state, r#"{"state": {"valence": 7.0}}"#).unwrap();

    let out = wybe()
        .args(["--offline", "--ticks", "3", "--config"])
        .arg(dir.path().join("missing.toml"))
        .arg("--state")
        .arg(&state)
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(out.status.success());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(saved["state"]["valence"].as_f64(), Some(0.0));
}
