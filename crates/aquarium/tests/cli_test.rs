//! Integration tests for the `aquarium` CLI binary.
//!
//! Argument parsing, config handling and error exit codes run without a
//! device; `status`, `actuator` and `monitor` talk to loopback stand-ins
//! (wiremock for the pull endpoint, a tokio-tungstenite server for the push
//! channel).
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use predicates::prelude::*;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::process::{Child, ChildStdout};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `aquarium` binary with env isolation.
///
/// Points `AQUARIUM_CONFIG` at `config` and clears the other
/// `AQUARIUM_*` variables so tests never touch the user's configuration.
fn aquarium_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("aquarium");
    cmd.env("AQUARIUM_CONFIG", config)
        .env("NO_COLOR", "1")
        .env_remove("AQUARIUM_PROFILE")
        .env_remove("AQUARIUM_ADDRESS")
        .env_remove("AQUARIUM_OUTPUT")
        .env_remove("AQUARIUM_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn scratch_config() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

/// Run the binary off the async runtime so loopback servers keep serving.
async fn run(config: PathBuf, args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || aquarium_cmd(&config).args(&args).output().unwrap())
        .await
        .unwrap()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

async fn device(body: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(body)
        .mount(&server)
        .await;
    server
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = scratch_config();
    let output = aquarium_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_lists_subcommands() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("monitor"))
            .and(predicate::str::contains("actuator"))
            .and(predicate::str::contains("schedule")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("aquarium"));
}

#[test]
fn test_completions_zsh() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Usage and config errors ─────────────────────────────────────────

#[test]
fn test_status_without_address() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No device address"));
}

#[test]
fn test_unknown_actuator_is_usage_error() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["--address", "127.0.0.1", "actuator", "heater", "on"])
        .assert()
        .code(2);
}

#[test]
fn test_empty_feeding_time_rejected_before_connecting() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["--address", "127.0.0.1:9", "schedule", "feeding-time", ""])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("feeding_time"));

    aquarium_cmd(&config)
        .args(["--address", "127.0.0.1:9", "schedule", "water-change", "soon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("water_change_interval"));
}

#[test]
fn test_unknown_profile() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["--profile", "reef", "status"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("reef"));
}

// ── Config management ───────────────────────────────────────────────

#[test]
fn test_config_show_without_file() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles"));
}

#[test]
fn test_config_init_show_and_set_address() {
    let (_dir, config) = scratch_config();

    aquarium_cmd(&config)
        .args(["config", "init", "--device", "192.168.70.37"])
        .assert()
        .success();
    assert!(config.exists());

    // a second init refuses to clobber
    aquarium_cmd(&config)
        .args(["config", "init", "--device", "192.168.70.38"])
        .assert()
        .code(3);

    aquarium_cmd(&config)
        .args(["config", "set-address", "10.0.0.9:8080"])
        .assert()
        .success();

    let output = aquarium_cmd(&config)
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["default_profile"], "default");
    assert_eq!(shown["profiles"]["default"]["address"], "10.0.0.9:8080");

    aquarium_cmd(&config)
        .args(["config", "show", "-o", "plain"])
        .assert()
        .success()
        .stdout("default\n");
}

#[test]
fn test_config_rejects_bad_address() {
    let (_dir, config) = scratch_config();
    aquarium_cmd(&config)
        .args(["config", "init", "--device", "http://10.0.0.5"])
        .assert()
        .code(2);
    assert!(!config.exists());
}

// ── status ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json() {
    let server = device(
        ResponseTemplate::new(200).set_body_json(json!({ "temperature": 24.5, "water_level": 11 })),
    )
    .await;
    let (_dir, config) = scratch_config();
    let address = server.address().to_string();

    let output = run(config, args(&["status", "--address", &address, "-o", "json"])).await;
    assert!(output.status.success(), "{output:?}");

    let status: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["temperature_celsius"], 24.5);
    assert_eq!(status["water_level_percent"], 50.0);
    assert_eq!(status["source"], "pull");
    assert_eq!(status["address"], address.as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain() {
    let server = device(
        ResponseTemplate::new(200).set_body_json(json!({ "temperature": 23.0, "distance": 17 })),
    )
    .await;
    let (_dir, config) = scratch_config();
    let address = server.address().to_string();

    let output = run(config, args(&["status", "-a", &address, "-o", "plain"])).await;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "23\n0\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_garbled_payload() {
    let server = device(ResponseTemplate::new(200).set_body_string("<html>")).await;
    let (_dir, config) = scratch_config();
    let address = server.address().to_string();

    let output = run(config, args(&["status", "-a", &address])).await;
    assert_eq!(output.status.code(), Some(4), "{output:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_unreachable() {
    let (_dir, config) = scratch_config();
    let address = format!("127.0.0.1:{}", free_port().await);

    let output = run(config, args(&["status", "-a", &address, "--timeout", "2"])).await;
    assert_eq!(output.status.code(), Some(7), "{output:?}");
}

// ── actuator ────────────────────────────────────────────────────────

fn write_profile(config: &Path, push_port: u16, extra: &str) {
    std::fs::write(
        config,
        format!(
            "[profiles.default]\naddress = \"127.0.0.1\"\npush_port = {push_port}\n{extra}"
        ),
    )
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_actuator_on_sends_pin_token() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let device = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        frame.into_text().unwrap().as_str().to_owned()
    });

    let (_dir, config) = scratch_config();
    write_profile(&config, port, "");

    let output = run(config, args(&["actuator", "light", "on", "-o", "plain"])).await;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "on\n");
    assert_eq!(device.await.unwrap(), "pin1_on");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_actuator_without_push_channel() {
    let (_dir, config) = scratch_config();
    write_profile(&config, free_port().await, "");

    let output = run(config, args(&["actuator", "fill", "off", "--wait", "300ms"])).await;
    assert_eq!(output.status.code(), Some(7), "{output:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_actuator_on_pull_only_profile() {
    let (_dir, config) = scratch_config();
    write_profile(&config, 81, "websocket = false\n");

    let output = run(config, args(&["actuator", "light", "toggle"])).await;
    assert_eq!(output.status.code(), Some(3), "{output:?}");
}

// ── monitor ─────────────────────────────────────────────────────────

/// Start `aquarium monitor` with piped stdin/stdout so lines can be fed
/// while it runs.
fn spawn_monitor(config: &Path, extra: &[&str]) -> Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_aquarium"))
        .arg("monitor")
        .args(extra)
        .env("AQUARIUM_CONFIG", config)
        .env("NO_COLOR", "1")
        .env_remove("AQUARIUM_PROFILE")
        .env_remove("AQUARIUM_ADDRESS")
        .env_remove("AQUARIUM_OUTPUT")
        .env_remove("AQUARIUM_TIMEOUT")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap()
}

fn stdout_lines(child: &mut Child) -> Lines<BufReader<ChildStdout>> {
    BufReader::new(child.stdout.take().unwrap()).lines()
}

/// Read JSON snapshot lines until one matches `pred`.
async fn snapshot_where(
    lines: &mut Lines<BufReader<ChildStdout>>,
    pred: impl Fn(&Value) -> bool,
) -> Value {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let line = lines.next_line().await.unwrap().unwrap();
            let snapshot: Value = serde_json::from_str(&line).unwrap();
            if pred(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .unwrap()
}

async fn exits_within(child: &mut Child, limit: Duration) -> bool {
    matches!(
        tokio::time::timeout(limit, child.wait()).await,
        Ok(Ok(status)) if status.success()
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_line_commands_reach_the_device() {
    let server = device(
        ResponseTemplate::new(200).set_body_json(json!({ "temperature": 24.5, "water_level": 11 })),
    )
    .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let push_port = listener.local_addr().unwrap().port();
    let push_device = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut frames = Vec::new();
        while frames.len() < 3 {
            let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            frames.push(frame.into_text().unwrap().as_str().to_owned());
        }
        frames
    });

    let (_dir, config) = scratch_config();
    std::fs::write(
        &config,
        format!(
            "[profiles.default]\naddress = \"{}\"\npush_port = {push_port}\npoll_interval_ms = 0\n",
            server.address()
        ),
    )
    .unwrap();

    let mut child = spawn_monitor(&config, &["-o", "json-compact"]);
    let mut stdin = child.stdin.take().unwrap();
    let mut lines = stdout_lines(&mut child);

    // link changes print a line each
    snapshot_where(&mut lines, |s| s["health"] == "connected").await;

    stdin
        .write_all(b"toggle light\nfeed 08:30\ninterval 24\nrefresh\n")
        .await
        .unwrap();
    let snapshot = snapshot_where(&mut lines, |s| s["tank"]["temperature_celsius"] == 24.5).await;
    assert_eq!(snapshot["water_level_percent"], 50.0);
    assert_eq!(snapshot["tank"]["last_updated_source"], "pull");
    assert_eq!(snapshot["actuators"]["light"], true);
    assert_eq!(snapshot["schedule"]["feeding_time"], "08:30");
    assert_eq!(snapshot["schedule"]["water_change_interval_hours"], 24);

    let frames = push_device.await.unwrap();
    assert_eq!(frames[0], "pin1_on");
    assert_eq!(
        serde_json::from_str::<Value>(&frames[1]).unwrap(),
        json!({ "action": "setFeedingTime", "time": "08:30" })
    );
    assert_eq!(
        serde_json::from_str::<Value>(&frames[2]).unwrap(),
        json!({ "action": "setWaterChangeInterval", "interval": "24" })
    );

    // switching devices wipes telemetry from the old one
    stdin.write_all(b"address 127.0.0.1:1\n").await.unwrap();
    snapshot_where(&mut lines, |s| {
        s["address"] == "127.0.0.1:1" && s["tank"]["temperature_celsius"].is_null()
    })
    .await;

    stdin.write_all(b"quit\n").await.unwrap();
    assert!(exits_within(&mut child, Duration::from_secs(10)).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_keeps_running_after_stdin_closes() {
    let server = device(ResponseTemplate::new(200).set_body_json(json!({ "temperature": 22.0 }))).await;
    let (_dir, config) = scratch_config();
    std::fs::write(
        &config,
        format!(
            "[profiles.default]\naddress = \"{}\"\nwebsocket = false\npoll_interval_ms = 0\n",
            server.address()
        ),
    )
    .unwrap();

    let mut child = spawn_monitor(&config, &[]);
    drop(child.stdin.take());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(child.try_wait().unwrap().is_none(), "monitor exited on stdin EOF");
    child.kill().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_quit_is_not_blocked_by_a_hung_refresh() {
    // accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let (_dir, config) = scratch_config();
    std::fs::write(
        &config,
        format!("[profiles.default]\naddress = \"{address}\"\nwebsocket = false\npoll_interval_ms = 0\n"),
    )
    .unwrap();

    let mut child = spawn_monitor(&config, &[]);
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"refresh\nquit\n").await.unwrap();

    assert!(exits_within(&mut child, Duration::from_secs(8)).await);
    silent.abort();
}
