//! Exit codes of the operator CLI.

use std::path::Path;
use std::process::Output;

use hello_mesh::config::schema::BACKEND_URL_ENV;
use hello_mesh::lifecycle::Shutdown;
use tokio::process::Command;

mod common;

async fn hello_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hello-cli"))
        .args(args)
        .env_remove(BACKEND_URL_ENV)
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("hello-mesh.toml");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_fetch_succeeds_against_live_backend() {
    let shutdown = Shutdown::new();
    let api = common::spawn_api(Default::default(), &shutdown).await;
    let url = format!("http://{}/", api);

    let output = hello_cli(&["fetch", "--url", &url]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({"status": "success", "text": "Hello from Go API!"})
    );
    shutdown.trigger();
}

#[tokio::test]
async fn test_fetch_exits_one_when_unreachable() {
    let url = format!("http://{}/", common::unreachable_addr().await);

    let output = hello_cli(&["fetch", "--url", &url]).await;

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["status"], "failed");
}

#[tokio::test]
async fn test_fetch_exits_one_on_error_status() {
    let backend = common::spawn_status_backend("503 Service Unavailable", "down").await;
    let url = format!("http://{}/", backend);

    let output = hello_cli(&["fetch", "--url", &url]).await;

    assert_eq!(output.status.code(), Some(1));
    let view = stdout_json(&output);
    assert_eq!(view["status"], "failed");
    assert_eq!(view["reason"], "backend answered with status 503");
}

#[tokio::test]
async fn test_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[deployment]\nnode_port = 30002\n");

    let output = hello_cli(&["check", "--config", &path]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "configuration is valid");
}

#[tokio::test]
async fn test_check_exits_one_on_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[deployment]\nnode_port = 80\n");

    let output = hello_cli(&["check", "--config", &path]).await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("deployment.node_port"), "{}", stderr);
}
