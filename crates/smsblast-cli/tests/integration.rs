#![allow(deprecated)]
use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn smsblast(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("smsblast").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SMSBLAST_CONFIG")
        .env_remove("TWILIO_ACCOUNT_SID")
        .env_remove("TWILIO_AUTH_TOKEN")
        .env_remove("TWILIO_API_BASE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_state(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("numbers.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn read_state(path: &PathBuf) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn bare_run_cmd(dir: &TempDir, server: &mockito::Server, state: &PathBuf) -> Command {
    let mut cmd = smsblast(dir);
    cmd.env("TWILIO_ACCOUNT_SID", "AC123")
        .env("TWILIO_AUTH_TOKEN", "secret")
        .arg("run")
        .arg("--state")
        .arg(state)
        .args(["--api-base", &server.url()]);
    cmd
}

fn run_cmd(dir: &TempDir, server: &mockito::Server, state: &PathBuf) -> Command {
    let mut cmd = bare_run_cmd(dir, server, state);
    cmd.args(["--sender-id", "ACME", "--name", "spring", "--body", "Spring sale!"]);
    cmd
}

// ---------------------------------------------------------------------------
// smsblast status
// ---------------------------------------------------------------------------

#[test]
fn status_reports_counts_and_pending() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false, "+101": true, "+102": false}"#);

    smsblast(&dir)
        .args(["status", "--state"])
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Numbers: 3  Sent: 1  Pending: 2"))
        .stdout(predicate::str::contains("+102"));

    assert!(!dir.path().join("numbers.json.bak").exists());
}

#[test]
fn status_json() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false, "+101": true}"#);

    let out = smsblast(&dir)
        .args(["status", "--json", "--state"])
        .arg(&state)
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["pending"], 1);
    assert_eq!(value["pending_numbers"][0], "+100");
}

#[test]
fn status_missing_state_fails() {
    let dir = TempDir::new().unwrap();
    smsblast(&dir)
        .args(["status", "--state", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load state file"));
}

#[test]
fn status_uses_state_file_from_config() {
    let dir = TempDir::new().unwrap();
    write_state(&dir, r#"{"+100": true}"#);
    std::fs::write(dir.path().join("smsblast.yaml"), "state_file: numbers.json\n").unwrap();

    smsblast(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("All numbers delivered."));
}

// ---------------------------------------------------------------------------
// smsblast run
// ---------------------------------------------------------------------------

#[test]
fn run_sends_pending_and_persists_state() {
    let dir = TempDir::new().unwrap();
    let original = r#"{"+100": false, "+101": true, "+102": false}"#;
    let state = write_state(&dir, original);

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::UrlEncoded("From".into(), "ACME".into()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sid": "SM0001"}"#)
        .expect(2)
        .create();

    run_cmd(&dir, &server, &state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Campaign: spring (2 pending)"))
        .stdout(predicate::str::contains("Sent 2, rejected 0. 0 number(s) still pending."));

    mock.assert();
    assert_eq!(
        read_state(&state),
        serde_json::json!({"+100": true, "+101": true, "+102": true})
    );
    let backup = dir.path().join("numbers.json.bak");
    assert_eq!(std::fs::read_to_string(backup).unwrap(), original);
}

#[test]
fn run_rejection_keeps_number_pending() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false, "+102": false}"#);

    let mut server = mockito::Server::new();
    server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::UrlEncoded("To".into(), "+100".into()))
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": 21211, "message": "The 'To' number is not valid."}"#)
        .create();
    server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::UrlEncoded("To".into(), "+102".into()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sid": "SM0002"}"#)
        .create();

    let out = run_cmd(&dir, &server, &state).arg("--json").output().unwrap();
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["remaining"], 1);
    assert_eq!(report["results"][0]["outcome"], "rejected");
    assert_eq!(report["results"][0]["reason"]["code"], 21211);
    assert_eq!(report["results"][1]["sid"], "SM0002");

    assert_eq!(
        read_state(&state),
        serde_json::json!({"+100": false, "+102": true})
    );
}

#[test]
fn run_without_sender_fails_before_loading_state() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);

    smsblast(&dir)
        .env("TWILIO_ACCOUNT_SID", "AC123")
        .env("TWILIO_AUTH_TOKEN", "secret")
        .args(["run", "--name", "spring", "--body", "hi", "--state"])
        .arg(&state)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no sender identity"));

    assert!(!dir.path().join("numbers.json.bak").exists());
    assert_eq!(read_state(&state), serde_json::json!({"+100": false}));
}

#[test]
fn run_rejects_both_sender_kinds() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);

    smsblast(&dir)
        .args(["run", "--from", "+15550001111", "--sender-id", "ACME", "--state"])
        .arg(&state)
        .assert()
        .failure();
}

#[test]
fn run_with_nothing_pending_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": true}"#);

    let mut server = mockito::Server::new();
    let mock = server.mock("POST", MESSAGES_PATH).expect(0).create();

    run_cmd(&dir, &server, &state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to send"));
    mock.assert();
}

#[test]
fn run_flags_override_invalid_config_fields() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);
    std::fs::write(
        dir.path().join("smsblast.yaml"),
        "sender:\n  mobile_number: \"+15550001111\"\n  alphanumeric_id: ACME\ncampaign:\n  name: spring\n  body: \"\"\n",
    )
    .unwrap();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("From".into(), "SHOP".into()),
            Matcher::UrlEncoded("Body".into(), "hi".into()),
        ]))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sid": "SM0003"}"#)
        .create();

    bare_run_cmd(&dir, &server, &state)
        .args(["--sender-id", "SHOP", "--body", "hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Campaign: spring (1 pending)"));

    mock.assert();
    assert_eq!(read_state(&state), serde_json::json!({"+100": true}));
}

#[test]
fn run_invalid_config_sender_still_fails_without_flags() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);
    std::fs::write(
        dir.path().join("smsblast.yaml"),
        "sender:\n  mobile_number: \"+15550001111\"\n  alphanumeric_id: ACME\n",
    )
    .unwrap();

    let server = mockito::Server::new();
    bare_run_cmd(&dir, &server, &state)
        .args(["--name", "spring", "--body", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config: sender:"));
}

#[test]
fn run_body_file_drops_trailing_newline() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);
    let body_file = dir.path().join("body.txt");
    std::fs::write(&body_file, "Spring sale!\nReply STOP to opt out\n\n").unwrap();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::UrlEncoded(
            "Body".into(),
            "Spring sale!\nReply STOP to opt out".into(),
        ))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sid": "SM0004"}"#)
        .create();

    bare_run_cmd(&dir, &server, &state)
        .args(["--sender-id", "ACME", "--name", "spring", "--body-file"])
        .arg(&body_file)
        .assert()
        .success();
    mock.assert();
}

#[test]
fn run_accepts_short_code_sender() {
    let dir = TempDir::new().unwrap();
    let state = write_state(&dir, r#"{"+100": false}"#);

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", MESSAGES_PATH)
        .match_body(Matcher::UrlEncoded("From".into(), "898211".into()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sid": "SM0005"}"#)
        .create();

    bare_run_cmd(&dir, &server, &state)
        .args(["--from", "898211", "--name", "spring", "--body", "hi"])
        .assert()
        .success();
    mock.assert();
}

// ---------------------------------------------------------------------------
// smsblast config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_flags_ambiguous_sender() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("smsblast.yaml"),
        "sender:\n  mobile_number: \"+15550001111\"\n  alphanumeric_id: ACME\n",
    )
    .unwrap();

    smsblast(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] sender:"));
}

#[test]
fn config_show_redacts_token() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("smsblast.yaml"),
        "twilio:\n  account_sid: AC123\n  auth_token: supersecret\n",
    )
    .unwrap();

    smsblast(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AC123"))
        .stdout(predicate::str::contains("supersecret").not());
}
