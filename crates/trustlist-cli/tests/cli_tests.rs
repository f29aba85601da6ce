//! Integration tests for the `trustlist` CLI binary.
//!
//! These tests exercise the CLI as a subprocess, verifying exit codes and
//! output. Most point at a closed port, so anything that reaches the network
//! fails fast; the save-failure test runs a small scripted HTTP stub.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

use trustlist_core::credentials::{BcryptHasher, PasswordHasher};

const DEAD_ADDR: &str = "http://127.0.0.1:19999";

/// Helper: locate the `trustlist` binary built by `cargo test`.
fn trustlist_bin() -> String {
    let path = env!("CARGO_BIN_EXE_trustlist");
    assert!(
        Path::new(path).exists(),
        "trustlist binary not found at {path}"
    );
    path.to_owned()
}

fn command(token: Option<&str>) -> Command {
    let mut cmd = Command::new(trustlist_bin());
    cmd.env("TRUSTLIST_ADDR", DEAD_ADDR)
        .env_remove("TRUSTLIST_TOKEN")
        .env_remove("TRUSTLIST_PASSWORD");
    if let Some(token) = token {
        cmd.env("TRUSTLIST_TOKEN", token);
    }
    cmd
}

fn collect(output: &Output) -> (i32, String, String) {
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

/// Helper: run trustlist with args and return (`exit_code`, stdout, stderr).
fn run(args: &[&str]) -> (i32, String, String) {
    collect(&command(None).args(args).output().expect("failed to execute trustlist"))
}

fn run_with_token(args: &[&str]) -> (i32, String, String) {
    collect(
        &command(Some("test-token"))
            .args(args)
            .output()
            .expect("failed to execute trustlist"),
    )
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "trustlist --version should exit 0");
    assert!(stdout.contains("trustlist"), "version output: {stdout}");
}

#[test]
fn test_help_lists_commands() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0);
    for command in ["login", "session", "hash-password", "navbar", "service"] {
        assert!(stdout.contains(command), "help should list '{command}': {stdout}");
    }
}

#[test]
fn test_subcommand_help() {
    for sub in ["navbar", "service"] {
        let (code, stdout, _) = run(&[sub, "--help"]);
        assert_eq!(code, 0, "{sub} --help should exit 0");
        assert!(!stdout.is_empty(), "{sub} --help should produce output");
    }
    let (_, stdout, _) = run(&["service", "--help"]);
    assert!(stdout.contains("delete-card"));
    assert!(stdout.contains("update-detail"));
}

// ── Local commands ───────────────────────────────────────────────────

#[test]
fn test_hash_password_output_verifies() {
    let (code, stdout, stderr) = run(&["hash-password", "--cost", "4", "correct horse"]);
    assert_eq!(code, 0, "hash-password failed: {stderr}");

    let hash = stdout.trim();
    assert!(hash.starts_with("$2"), "not a bcrypt hash: {hash}");
    assert!(BcryptHasher::new(4).verify("correct horse", hash));
    assert!(!BcryptHasher::new(4).verify("wrong horse", hash));
}

#[test]
fn test_add_card_rejects_malformed_detail_before_network() {
    let (code, _, stderr) = run_with_token(&[
        "service",
        "add-card",
        "Audit",
        "--detail",
        "heading only|no link",
    ]);
    assert_ne!(code, 0);
    assert!(
        stderr.contains("heading|description|link"),
        "should explain the detail format: {stderr}"
    );
}

#[test]
fn test_add_card_requires_a_detail() {
    let (code, _, stderr) = run_with_token(&["service", "add-card", "Audit"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("--detail"), "should mention --detail: {stderr}");
}

#[test]
fn test_service_set_rejects_invalid_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("service.json");
    fs::write(&path, "{ not json").expect("write failed");

    let (code, _, stderr) =
        run_with_token(&["service", "set", "--file", path.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not valid JSON"), "stderr: {stderr}");
}

#[test]
fn test_service_set_missing_file() {
    let (code, _, stderr) = run_with_token(&[
        "service",
        "set",
        "--file",
        "/tmp/trustlist-test-nonexistent.json",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("failed to read"), "stderr: {stderr}");
}

#[test]
fn test_navbar_update_rejects_unknown_kind() {
    let (code, _, stderr) = run_with_token(&["navbar", "update", "abc", "--kind", "dropdown"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("dropdown"), "stderr: {stderr}");
}

// ── Commands that need a server ──────────────────────────────────────

#[test]
fn test_admin_command_without_token() {
    let (code, _, stderr) = run(&["navbar", "seed"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no token provided"), "stderr: {stderr}");
}

#[test]
fn test_unreachable_server_is_reported() {
    let (code, _, stderr) = run(&["navbar", "list"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("request failed"), "stderr: {stderr}");
}

#[test]
fn test_login_with_unreachable_server() {
    let (code, _, stderr) = run(&[
        "login",
        "--email",
        "ops@example.com",
        "--password",
        "hunter2",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Error"), "stderr: {stderr}");
    assert!(!stderr.contains("hunter2"), "password leaked: {stderr}");
}

// ── Save failure against a live server ───────────────────────────────

const SERVICE_BODY: &str = r#"{"service":{"imageLink":"news.example.com","para":{"content":"Now certified","link":"example.com/cert"},"cards":[],"version":4}}"#;
const CONFLICT_BODY: &str = r#"{"error":"conflict","message":"version conflict: expected 4, found 5"}"#;

/// Read one request and return its `METHOD path` line. The body is drained.
fn read_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();

    request_line
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serve `GET /api/service` with a fixed document and reject every
/// `POST /api/service` with 409. Returns the address and the request log.
fn spawn_conflicting_server() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let request = read_request(&stream);
            let (status, body) = match request.as_str() {
                "GET /api/service" => ("200 OK", SERVICE_BODY),
                "POST /api/service" => ("409 Conflict", CONFLICT_BODY),
                _ => ("404 Not Found", r#"{"error":"not_found","message":"no route"}"#),
            };
            seen.lock().unwrap().push(request);
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    (addr, log)
}

#[test]
fn test_failed_save_reloads_server_copy() {
    let (addr, log) = spawn_conflicting_server();

    let output = command(Some("test-token"))
        .env("TRUSTLIST_ADDR", &addr)
        .args(["service", "set-fields", "--image-link", "other.example.com"])
        .output()
        .expect("failed to execute trustlist");
    let (code, stdout, stderr) = collect(&output);

    assert_ne!(code, 0);
    assert!(
        stdout.contains("save failed; reloaded server copy (version 4)"),
        "stdout: {stdout}"
    );
    assert!(stderr.contains("409"), "stderr: {stderr}");
    assert_eq!(
        *log.lock().unwrap(),
        ["GET /api/service", "POST /api/service", "GET /api/service"]
    );
}
