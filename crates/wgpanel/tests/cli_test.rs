//! Integration tests for the `wgpanel` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling run
//! without a panel; the end-to-end cases talk to a wiremock panel.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `wgpanel` binary with env isolation.
///
/// Clears all `WGPANEL_*` env vars and points config and data directories
/// at `home` so tests never touch the user's real configuration.
fn wgpanel_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wgpanel");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("WGPANEL_PROFILE")
        .env_remove("WGPANEL_URL")
        .env_remove("WGPANEL_OUTPUT")
        .env_remove("WGPANEL_INSECURE")
        .env_remove("WGPANEL_TIMEOUT")
        .env_remove("WGPANEL_USERNAME")
        .env_remove("WGPANEL_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn wgpanel_cmd() -> assert_cmd::Command {
    wgpanel_cmd_in(Path::new("/tmp/wgpanel-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn panel() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/service/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": "admin",
            "listenIP": "0.0.0.0",
            "listenPort": 5000,
            "apiPrefix": "/api",
            "panelID": "p1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "if1", "ifname": "wg0", "endpoint": "vpn.example.com", "port": 51820, "mtu": 1420, "publicKey": "pk1", "enabled": true},
            {"id": "if2", "ifname": "wg1", "endpoint": "vpn.example.com", "port": 51821, "mtu": 1420, "publicKey": "pk2", "enabled": false}
        ])))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = wgpanel_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    wgpanel_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("WireGuard")
            .and(predicate::str::contains("interfaces"))
            .and(predicate::str::contains("servers"))
            .and(predicate::str::contains("clients")),
    );
}

#[test]
fn test_version_flag() {
    wgpanel_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wgpanel"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    wgpanel_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    wgpanel_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = wgpanel_cmd().arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

#[test]
fn test_missing_profile_without_url() {
    let output = wgpanel_cmd().args(["interfaces", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("Profile 'default' not found"), "{text}");
}

#[test]
fn test_unreachable_panel_is_a_connection_error() {
    let home = tempfile::tempdir().unwrap();
    let output = wgpanel_cmd_in(home.path())
        .args(["--url", "http://127.0.0.1:1/api", "--timeout", "2", "interfaces", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn test_create_requires_a_body() {
    let output = wgpanel_cmd()
        .args(["--url", "http://127.0.0.1:1/api", "interfaces", "create"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_path_needs_no_panel() {
    let home = tempfile::tempdir().unwrap();
    wgpanel_cmd_in(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml").and(predicate::str::contains("default.json")));
}

// ── Against a panel ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_interfaces_list_plain_and_selection_persisted() {
    let server = panel().await;
    let home = tempfile::tempdir().unwrap();

    let output = wgpanel_cmd_in(home.path())
        .args(["--url", &server.uri(), "-o", "plain", "interfaces", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "if1\nif2\n");

    let state = home.path().join("data/wgpanel/state/default.json");
    let doc = std::fs::read_to_string(state).unwrap();
    assert!(doc.contains("p1_uiState"), "{doc}");
    assert!(doc.contains("if1"), "{doc}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sort_preference_survives_restart() {
    let server = panel().await;
    let home = tempfile::tempdir().unwrap();

    wgpanel_cmd_in(home.path())
        .args(["--url", &server.uri(), "prefs", "sort", "enabled", "--desc"])
        .assert()
        .success();

    let output = wgpanel_cmd_in(home.path())
        .args(["--url", &server.uri(), "-o", "json", "prefs", "show"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["scope"], "p1");
    assert_eq!(
        shown["sortOrder"],
        json!(["enabled-d", "name-a", "lastHandshake-d", "totalTraffic-d"])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_offset_names_the_field() {
    let server = panel().await;
    Mock::given(method("GET"))
        .and(path("/service/snatroamingoffsetvalid"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "offset exceeds network size",
            "error_params": "offset"
        })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = wgpanel_cmd_in(home.path())
        .args([
            "--url",
            &server.uri(),
            "service",
            "check-offset",
            "--ifname",
            "eth0",
            "--netmapsrc",
            "10.0.0.0/24",
            "--offset",
            "999",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("offset exceeds network size"), "{text}");
}
