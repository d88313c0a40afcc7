//! Integration tests for the pcbcam CLI.
//!
//! Each test runs the binary with an isolated home, config and credentials
//! location. Tests that talk to a server start a small axum app on an
//! ephemeral port in a background thread.
//!
//! Run with: `cargo test --package pcbcam-cli --test cli_integration`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

const GOOD_KEY: &str = "cli-secret";

/// An isolated environment for one CLI invocation.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn credentials(&self) -> PathBuf {
        self.dir.path().join("credentials").join("api-key")
    }

    fn command(&self) -> Command {
        let home = self.dir.path();
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pcbcam"));
        cmd.current_dir(home)
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join("config"))
            .env("XDG_DATA_HOME", home.join("data"))
            .env("PCBCAM_CREDENTIALS_FILE", self.credentials())
            .env_remove("PCBCAM_API_KEY")
            .env_remove("PCBCAM_SITE")
            .env_remove("PCBCAM_API_PREFIX")
            .env_remove("PCBCAM_EXCLUDED_NAMESPACES")
            .env_remove("PCBCAM_PASSWORD");
        cmd
    }

    /// Helper to run pcbcam with given arguments.
    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute pcbcam command")
    }

    fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut cmd = self.command();
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.args(args)
            .output()
            .expect("Failed to execute pcbcam command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn descriptor() -> Value {
    json!({
        "BoardApi": {
            "__data": {"url": "api/boards"},
            "echo": {"simple_url": "api/boards/echo", "config": {"require_login": true}},
            "pages": {"simple_url": "api/boards/pages"}
        },
        "UserApi": {
            "api_login": {"simple_url": "api/user/login", "args": ["username", "password"]}
        },
        "user": {"id": -1, "username": null, "authenticated": false}
    })
}

async fn echo(headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key != Some(GOOD_KEY) {
        return (StatusCode::FORBIDDEN, Json(json!({"detail": "login required"})));
    }
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (StatusCode::OK, Json(json!({"echo": body})))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "ada" && body["password"] == "pw" {
        (StatusCode::OK, Json(json!(GOOD_KEY)))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!("Invalid credentials")))
    }
}

async fn pages(Json(body): Json<Value>) -> Json<Value> {
    match body["page"].as_u64() {
        Some(1) => Json(json!({"results": [1, 2], "next": "page-2"})),
        Some(2) => Json(json!({"results": [3], "next": null})),
        _ => Json(json!({"results": [], "next": null})),
    }
}

/// Start the mock server on a background runtime and return its site URL.
fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/framework/endpoints", get(|| async { Json(descriptor()) }))
        .route("/api/boards/echo", post(echo))
        .route("/api/boards/pages", post(pages))
        .route("/api/user/login", post(login));

    let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

/// A site nothing listens on.
fn dead_site() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn write_token(path: &Path, token: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, token).unwrap();
}

// =============================================================================
// Offline commands
// =============================================================================

#[test]
fn test_help() {
    let output = Sandbox::new().run(&["--help"]);
    assert!(output.status.success());

    let out = stdout(&output);
    for command in ["endpoints", "describe", "call", "upload", "walk", "login", "config"] {
        assert!(out.contains(command), "help is missing {}: {}", command, out);
    }
}

#[test]
fn test_config_get_defaults_and_env() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["config", "get", "site"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "http://localhost:5000");

    let output = sandbox.run(&["config", "get", "excluded-namespaces"]);
    assert_eq!(stdout(&output).trim(), "user");

    let output = sandbox.run_with_env(
        &["config", "get", "site"],
        &[("PCBCAM_SITE", "https://cam.example.com")],
    );
    assert_eq!(stdout(&output).trim(), "https://cam.example.com");
}

#[test]
fn test_config_set_persists() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["config", "set", "api_prefix", "/v2"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = sandbox.run(&["config", "get", "api_prefix"]);
    assert_eq!(stdout(&output).trim(), "/v2");

    let output = sandbox.run(&["config", "set", "site", "ftp://nope"]);
    assert!(!output.status.success());

    let output = sandbox.run(&["config", "get", "colour"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown config key"));
}

#[test]
fn test_logout() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["logout"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Not logged in"));

    write_token(&sandbox.credentials(), "stale");
    let output = sandbox.run(&["logout"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Logged out"));
    assert!(!sandbox.credentials().exists());
}

#[test]
fn test_bad_arg_is_rejected() {
    let output = Sandbox::new().run(&["call", "BoardApi", "echo", "--arg", "novalue"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Expected key=value"));
}

#[test]
fn test_unreachable_site_fails() {
    let site = dead_site();
    let output = Sandbox::new().run(&["--site", &site, "endpoints"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load endpoints"));
}

// =============================================================================
// Against a live server
// =============================================================================

#[test]
fn test_endpoints_lists_namespaces() {
    let site = spawn_server();
    let output = Sandbox::new().run(&["--site", &site, "endpoints"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("BoardApi"));
    assert!(out.contains("echo"));
    assert!(out.contains("UserApi"));
    assert!(!out.contains("📦 user"));
}

#[test]
fn test_describe_shows_url() {
    let site = spawn_server();
    let output = Sandbox::new().run(&["--site", &site, "describe", "UserApi", "api_login"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains(&format!("{}/api/user/login", site)));
    assert!(out.contains("username, password"));
}

#[test]
fn test_call_requires_login() {
    let site = spawn_server();
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["--site", &site, "call", "BoardApi", "echo", "--arg", "n=1"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Authentication required"), "stderr: {}", err);
    assert!(err.contains("403"), "stderr: {}", err);
}

#[test]
fn test_login_then_call() {
    let site = spawn_server();
    let sandbox = Sandbox::new();

    let output = sandbox.run(&[
        "--site", &site, "login", "--username", "ada", "--password", "nope",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid credentials"));
    assert!(!sandbox.credentials().exists());

    let output = sandbox.run(&[
        "--site", &site, "login", "--username", "ada", "--password", "pw",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        std::fs::read_to_string(sandbox.credentials()).unwrap(),
        GOOD_KEY
    );

    let output = sandbox.run(&[
        "--site",
        &site,
        "call",
        "BoardApi",
        "echo",
        "--data",
        r#"{"side": "top"}"#,
        "--arg",
        "n=2",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let payload: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payload, json!({"echo": {"side": "top", "n": 2}}));
}

#[test]
fn test_env_key_overrides_store() {
    let site = spawn_server();
    let sandbox = Sandbox::new();
    write_token(&sandbox.credentials(), "stale");

    let output = sandbox.run_with_env(
        &["--site", &site, "call", "BoardApi", "echo"],
        &[("PCBCAM_API_KEY", GOOD_KEY)],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let payload: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payload, json!({"echo": {}}));
}

#[test]
fn test_walk_prints_items() {
    let site = spawn_server();
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["--site", &site, "walk", "BoardApi", "pages"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["1", "2", "3"]);

    let output = sandbox.run(&["--site", &site, "walk", "BoardApi", "pages", "--limit", "2"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().count(), 2);
}
