//! End-to-end integration tests for the complete tracking flow.
//!
//! Tests the full pipeline: signals on stdin → `ft watch` → database → `ft report`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn ft_binary() -> String {
    env!("CARGO_BIN_EXE_ft").to_string()
}

/// Builds an `ft` command isolated to the given temp directory.
fn ft(temp: &Path) -> Command {
    let mut command = Command::new(ft_binary());
    command
        .env("HOME", temp)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("RUST_LOG")
        .env("FT_DATABASE_PATH", temp.join("data").join("ft.db"));
    command
}

/// Runs `ft watch` with the given lines on stdin.
fn watch(temp: &Path, input: &str) -> Output {
    let mut child = ft(temp)
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ft watch");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("failed to write signals");

    child.wait_with_output().expect("failed to wait for ft watch")
}

fn report_json(temp: &Path, since: &str, to: &str) -> serde_json::Value {
    let output = ft(temp)
        .args(["report", "--json", "--since", since, "--to", to])
        .output()
        .expect("failed to run ft report");
    assert!(
        output.status.success(),
        "ft report should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("report output should be JSON")
}

fn app_totals(report: &serde_json::Value) -> Vec<(String, i64)> {
    report["apps"]
        .as_array()
        .expect("apps array")
        .iter()
        .map(|app| {
            (
                app["name"].as_str().unwrap().to_string(),
                app["duration_secs"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_watch_then_report() {
    let temp = TempDir::new().unwrap();
    let input = r#"{"type":"focus_gained","identifier":"com.a","display_name":"A","at":"2025-01-01T00:00:00Z"}
{"type":"focus_gained","identifier":"com.b","display_name":"B","at":"2025-01-01T00:00:10Z"}
{"type":"focus_gained","identifier":"com.a","display_name":"A","at":"2025-01-01T00:00:15Z"}
{"type":"process_terminating","at":"2025-01-01T00:00:20Z"}
"#;

    let output = watch(temp.path(), input);
    assert!(
        output.status.success(),
        "ft watch should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Processed 4 signals (0 skipped), recorded 3 intervals"
    );

    let report = report_json(temp.path(), "2025-01-01T00:00:00Z", "2025-01-01T00:00:10Z");
    assert_eq!(app_totals(&report), vec![("A".to_string(), 10)]);

    let report = report_json(temp.path(), "2025-01-01T00:00:00Z", "2025-01-01T00:00:20Z");
    assert_eq!(
        app_totals(&report),
        vec![("A".to_string(), 15), ("B".to_string(), 5)]
    );
    assert_eq!(report["total_secs"], 20);
}

#[test]
fn test_sleep_is_not_counted() {
    let temp = TempDir::new().unwrap();
    let input = r#"{"type":"focus_gained","identifier":"com.a","display_name":"A","at":"2025-01-01T00:00:00Z"}
{"type":"system_suspending","at":"2025-01-01T00:01:00Z"}
{"type":"system_resumed","focused_application":null,"at":"2025-01-01T01:00:00Z"}
{"type":"system_resumed","focused_application":{"identifier":"com.a","display_name":"A"},"at":"2025-01-01T01:00:05Z"}
{"type":"process_terminating","at":"2025-01-01T01:01:05Z"}
"#;

    let output = watch(temp.path(), input);
    assert!(output.status.success());

    let report = report_json(temp.path(), "2025-01-01T00:00:00Z", "2025-01-01T02:00:00Z");
    assert_eq!(app_totals(&report), vec![("A".to_string(), 120)]);
}

#[test]
fn test_ignored_app_not_reported() {
    let temp = TempDir::new().unwrap();
    let input = r#"{"type":"focus_gained","identifier":"com.apple.loginwindow","display_name":"loginwindow","at":"2025-01-01T00:00:00Z"}
{"type":"focus_gained","identifier":"com.a","display_name":"A","at":"2025-01-01T00:05:00Z"}
{"type":"process_terminating","at":"2025-01-01T00:06:00Z"}
"#;

    let output = watch(temp.path(), input);
    assert!(output.status.success());

    let report = report_json(temp.path(), "2025-01-01T00:00:00Z", "2025-01-01T01:00:00Z");
    assert_eq!(app_totals(&report), vec![("A".to_string(), 60)]);

    let status = ft(temp.path()).arg("status").output().unwrap();
    let status = String::from_utf8_lossy(&status.stdout);
    assert!(status.contains("Intervals:    2"), "{status}");
}

#[test]
fn test_watch_sessions_accumulate_across_restarts() {
    let temp = TempDir::new().unwrap();

    let first = r#"{"type":"focus_gained","identifier":"com.a","display_name":"A","at":"2025-01-01T00:00:00Z"}
{"type":"process_terminating","at":"2025-01-01T00:00:30Z"}
"#;
    let second = r#"{"type":"focus_gained","identifier":"com.a","display_name":"Editor A","at":"2025-01-01T00:10:00Z"}
{"type":"process_terminating","at":"2025-01-01T00:10:45Z"}
"#;
    assert!(watch(temp.path(), first).status.success());
    assert!(watch(temp.path(), second).status.success());

    let report = report_json(temp.path(), "2025-01-01T00:00:00Z", "2025-01-01T01:00:00Z");
    assert_eq!(app_totals(&report), vec![("Editor A".to_string(), 75)]);
}

#[test]
fn test_report_rejects_reversed_range() {
    let temp = TempDir::new().unwrap();
    let output = ft(temp.path())
        .args([
            "report",
            "--since",
            "2025-01-01T01:00:00Z",
            "--to",
            "2025-01-01T00:00:00Z",
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("is before --since"));
}
