//! Integration tests for the `hvaclink` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling run
//! without a backend; the device tests point `--api-url` at a wiremock
//! server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `hvaclink` binary with env isolation.
///
/// Clears all `HVACLINK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn hvaclink_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hvaclink");
    cmd.env("HOME", "/tmp/hvaclink-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/hvaclink-cli-test-nonexistent")
        .env_remove("HVACLINK_PROFILE")
        .env_remove("HVACLINK_API_URL")
        .env_remove("HVACLINK_REALTIME_URL")
        .env_remove("HVACLINK_WEATHER_URL")
        .env_remove("HVACLINK_VENDOR_URL")
        .env_remove("HVACLINK_SIGN_TOKEN")
        .env_remove("HVACLINK_TOKEN")
        .env_remove("HVACLINK_OUTPUT")
        .env_remove("HVACLINK_INSECURE")
        .env_remove("HVACLINK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || hvaclink_cmd().args(&args).output().unwrap())
        .await
        .unwrap()
}

fn args(server: &MockServer, rest: &[&str]) -> Vec<String> {
    let mut all = vec!["--api-url".to_owned(), format!("{}/", server.uri())];
    all.extend(rest.iter().map(|s| (*s).to_owned()));
    all
}

async fn mount_device_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hvacs/midea/nastp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {
                "metadata": [
                    { "id": 7, "deviceSn": "ABC123", "name": "Lobby", "set_temperature": 22, "run_mode": 66 },
                    { "id": 8, "deviceSn": "XYZ789", "name": "Office", "set_temperature": 25, "run_mode": 0 }
                ]
            }
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = hvaclink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    hvaclink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("indoor units")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("fleet"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    hvaclink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hvaclink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    hvaclink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    hvaclink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = hvaclink_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_list_without_config() {
    hvaclink_cmd()
        .args(["devices", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init").or(predicate::str::contains("api-url")));
}

#[test]
fn test_unknown_profile() {
    let output = hvaclink_cmd()
        .args(["--profile", "nope", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("nope"));
}

#[test]
fn test_config_show_no_config() {
    // Falls back to the default config when no file exists.
    hvaclink_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_invalid_output_format() {
    let output = hvaclink_cmd()
        .args(["--output", "invalid", "devices", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("invalid"));
}

#[test]
fn test_invalid_run_mode() {
    let output = hvaclink_cmd()
        .args(["devices", "mode", "ABC123", "turbo"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("turbo"));
}

#[test]
fn test_watch_requires_realtime_url() {
    hvaclink_cmd()
        .args(["--api-url", "http://127.0.0.1:9/", "watch", "--for", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Realtime channel is not configured"));
}

#[test]
fn test_unreachable_backend() {
    let output = hvaclink_cmd()
        .args(["--api-url", "http://127.0.0.1:9/", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("Server is unreachable"));
}

// ── Config round trip ───────────────────────────────────────────────

#[test]
fn test_config_init_profiles_and_use() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = || {
        let mut cmd = hvaclink_cmd();
        cmd.env("HOME", dir.path()).env("XDG_CONFIG_HOME", dir.path());
        cmd
    };

    in_dir()
        .args([
            "config",
            "init",
            "--name",
            "plant",
            "--api-url",
            "https://bms.example.com/api/v1/",
            "--realtime-url",
            "wss://bms.example.com/realtime",
        ])
        .assert()
        .success();

    in_dir()
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plant *"));

    in_dir()
        .args(["--profile", "plant", "config", "set", "timeout", "5"])
        .assert()
        .success();

    let output = in_dir()
        .args(["--profile", "plant", "config", "set", "timeout", "soon"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = in_dir().args(["config", "use", "nope"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("plant"));

    in_dir()
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bms.example.com"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json() {
    let server = MockServer::start().await;
    mount_device_list(&server).await;

    let output = run(args(&server, &["-o", "json-compact", "devices", "list"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let serials: Vec<_> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["serial"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(serials, ["ABC123", "XYZ789"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_plain_with_search() {
    let server = MockServer::start().await;
    mount_device_list(&server).await;

    let output = run(args(
        &server,
        &["-o", "plain", "devices", "list", "--search", "office"],
    ))
    .await;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "XYZ789");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_temperature_is_clamped_and_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-by-device-sn"))
        .and(body_json(json!({
            "device_name": "ABC123",
            "content": [{
                "deviceType": 4,
                "instructions": [{ "command": "SetTemperature", "parameter": 30 }]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": { "messages": "Temperature updated" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(args(&server, &["devices", "temp", "ABC123", "35"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Temperature updated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_power_toggle_reports_new_state() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/hvacs/midea/power-on-off"))
        .and(query_param("device_sn", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "deviceSn": "ABC123", "run_mode": 0 }
        })))
        .mount(&server)
        .await;

    let output = run(args(&server, &["devices", "power", "ABC123"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Device 'ABC123' is powered off."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mode_off_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(args(&server, &["devices", "mode", "ABC123", "off"])).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("power toggle"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backend_error_is_shown_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-by-device-sn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 500,
            "message": "Device ABC123 is offline"
        })))
        .mount(&server)
        .await;

    let output = run(args(&server, &["devices", "fan", "ABC123", "3"])).await;
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("Device ABC123 is offline"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_confirmation() {
    let server = MockServer::start().await;
    mount_device_list(&server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(args(&server, &["devices", "delete", "ABC123"])).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_with_yes() {
    let server = MockServer::start().await;
    mount_device_list(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/hvacs/delete-midea"))
        .and(query_param("midea_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Deleted device ABC123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(args(&server, &["--yes", "devices", "delete", "ABC123"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Deleted device ABC123."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fleet_unlock_all_refuses_without_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(args(&server, &["fleet", "unlock-all"])).await;
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("fleet unlock-all"), "{text}");
    assert!(text.contains("--yes"), "{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fleet_power_on_needs_no_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-all-devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "All devices updated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(args(&server, &["fleet", "power", "on"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
}

// ── Vendor gateway ──────────────────────────────────────────────────

#[test]
fn test_vendor_without_url_is_not_configured() {
    let output = hvaclink_cmd()
        .args(["--api-url", "http://127.0.0.1:9/", "vendor", "units"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("Vendor gateway is not configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_vendor_properties_default_to_listed_units() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device"))
        .and(wiremock::matchers::header("sign", "s1gn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "deviceSn": "1:COM1-0-9-1-E", "name": "4115", "type": "idu" },
                { "deviceSn": "1:COM1-0-9-2-E", "name": "4114", "type": "idu" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/iduProp"))
        .and(body_json(json!({ "device_sn_list": ["1:COM1-0-9-1-E", "1:COM1-0-9-2-E"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "device_sn": "1:COM1-0-9-1-E", "device_name": "Room 4115", "indoor_temp": 24.5 },
                { "device_sn": "1:COM1-0-9-2-E", "device_name": "Room 4114", "indoor_temp": 23 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vendor_url = format!("{}/", server.uri());
    let output = run(args(
        &server,
        &[
            "-o",
            "plain",
            "vendor",
            "--vendor-url",
            &vendor_url,
            "--sign-token",
            "s1gn",
            "properties",
        ],
    ))
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["1:COM1-0-9-1-E", "1:COM1-0-9-2-E"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_vendor_group_sends_power_levels() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/power/group/deviceSetting"))
        .and(body_json(json!({
            "device_sns": ["1:COM1-0-9-1-E"],
            "fan_power": 2,
            "heat_power": 0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "Delta",
            "indoorDevices": [{ "deviceSn": "1:COM1-0-9-1-E", "name": "4115", "type": "idu" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vendor_url = format!("{}/", server.uri());
    let output = run(args(
        &server,
        &[
            "vendor",
            "--vendor-url",
            &vendor_url,
            "group",
            "1:COM1-0-9-1-E",
            "--fan-power",
            "2",
        ],
    ))
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Group setting applied to 1 device(s).")
    );
}
