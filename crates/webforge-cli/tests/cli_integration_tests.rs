//! CLI integration tests for webforge
//!
//! Tests the webforge CLI commands end-to-end using assert_cmd. Every test
//! gets its own configuration directory, so the database, config file and
//! preview output never leak between tests.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a command isolated in `dir`
#[allow(deprecated)]
fn webforge_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("webforge").unwrap();
    cmd.current_dir(dir.path());
    cmd.env("WEBFORGE_CONFIG_DIR", dir.path().join("config"));
    cmd.env_remove("WEBFORGE_API_KEY");
    cmd.env_remove("OPENAI_API_KEY");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_ok(dir: &TempDir, args: &[&str]) -> String {
    let output = webforge_cmd(dir).args(args).assert().success();
    String::from_utf8(output.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_fresh_install_has_default_project() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* default - My First Project (2 files)"));
}

#[test]
fn test_create_and_select_projects() {
    let dir = TempDir::new().unwrap();

    webforge_cmd(&dir)
        .args(["projects", "create", "Landing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project created: Landing"));

    let listing = run_ok(&dir, &["projects", "list"]);
    assert!(listing.contains("* "));
    assert!(listing.lines().any(|l| l.starts_with('*') && l.contains("Landing")));

    run_ok(&dir, &["projects", "select", "default"]);
    let shown = run_ok(&dir, &["--format", "json", "projects", "show"]);
    let project: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(project["id"], "default");
    assert_eq!(project["files"][0]["name"], "index.html");
}

#[test]
fn test_last_project_cannot_be_deleted() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["projects", "delete", "default"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E004"));
}

#[test]
fn test_unknown_project_suggests_listing() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["projects", "select", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"))
        .stderr(predicate::str::contains("webforge projects list"));
}

#[test]
fn test_file_commands() {
    let dir = TempDir::new().unwrap();

    webforge_cmd(&dir)
        .args(["files", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("new.js [javascript]"));

    run_ok(&dir, &["files", "write", "style.css", "--content", "p { color: red; }"]);
    webforge_cmd(&dir)
        .args(["files", "show", "style.css"])
        .assert()
        .success()
        .stdout(predicate::str::contains("p { color: red; }"));

    run_ok(&dir, &["files", "delete", "new.js"]);
    run_ok(&dir, &["files", "delete", "style.css"]);
    webforge_cmd(&dir)
        .args(["files", "delete", "index.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E003"));
}

#[test]
fn test_files_write_from_stdin() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["files", "write", "index.html"])
        .write_stdin("<div>from stdin</div>")
        .assert()
        .success();

    webforge_cmd(&dir)
        .args(["preview", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<div>from stdin</div>"))
        .stdout(predicate::str::contains("<!DOCTYPE html>"));
}

#[test]
fn test_preview_writes_host_page() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("index.html"));

    let preview_dir = dir.path().join("config").join("preview");
    let host = std::fs::read_to_string(preview_dir.join("index.html")).unwrap();
    assert!(host.contains("sandbox=\"allow-scripts allow-same-origin\""));
    let document = std::fs::read_to_string(preview_dir.join("preview.html")).unwrap();
    assert!(document.contains("<style>"));
}

#[test]
fn test_chat_without_key_asks_for_settings() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["chat", "make a button"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E100"))
        .stderr(predicate::str::contains("settings set api_key"));

    webforge_cmd(&dir)
        .args(["history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No messages yet"));
}

#[test]
fn test_settings_set_and_show() {
    let dir = TempDir::new().unwrap();

    webforge_cmd(&dir)
        .args(["settings", "set", "api_key", "sk-cli-test-9876"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set api_key = ***9876"))
        .stdout(predicate::str::contains("reinitialised"));

    webforge_cmd(&dir)
        .args(["settings", "set", "font_size", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("font_size"));

    webforge_cmd(&dir)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api_key = ***9876"))
        .stdout(predicate::str::contains("font_size = 14"))
        .stdout(predicate::str::contains("sk-cli-test").not());
}

#[test]
fn test_config_roundtrip() {
    let dir = TempDir::new().unwrap();

    run_ok(&dir, &["config", "set", "llm.model", "gpt-4o-mini"]);
    webforge_cmd(&dir)
        .args(["config", "get", "llm.model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("gpt-4o-mini\n"));

    webforge_cmd(&dir)
        .args(["config", "set", "api_key", "sk-nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not stored in config.toml"));

    run_ok(&dir, &["config", "reset"]);
    webforge_cmd(&dir)
        .args(["config", "get", "llm.model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("gpt-3.5-turbo\n"));
}

#[test]
fn test_doctor_reports_missing_key() {
    let dir = TempDir::new().unwrap();
    webforge_cmd(&dir)
        .args(["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Database: Connected"))
        .stdout(predicate::str::contains("[!!] API Key: Not configured"));
}

async fn mock_completion(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn configure_endpoint(dir: &TempDir, server: &MockServer) {
    run_ok(dir, &["config", "set", "llm.base_url", &server.uri()]);
    run_ok(dir, &["config", "set", "preview.settings_reopen_delay_ms", "0"]);
    run_ok(dir, &["settings", "set", "api_key", "sk-mock"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_applies_generated_css() {
    let server = mock_completion(
        200,
        json!({
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "h1 { color: crimson; }"},
                "finish_reason": "stop"
            }]
        }),
    )
    .await;

    let dir = TempDir::new().unwrap();
    configure_endpoint(&dir, &server);

    webforge_cmd(&dir)
        .args(["chat", "make the heading crimson"])
        .assert()
        .success()
        .stdout(predicate::str::contains("h1 { color: crimson; }"))
        .stdout(predicate::str::contains("applied to style.css"));

    webforge_cmd(&dir)
        .args(["files", "show", "css-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crimson"));

    let history = run_ok(&dir, &["--format", "json", "history"]);
    let messages: serde_json::Value = serde_json::from_str(&history).unwrap();
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[1]["isGenerating"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_reports_quota_failure() {
    let server = mock_completion(
        429,
        json!({"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    configure_endpoint(&dir, &server);

    webforge_cmd(&dir)
        .args(["chat", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Quota exceeded (429)"))
        .stderr(predicate::str::contains("Settings:"));

    webforge_cmd(&dir)
        .args(["history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("❌"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interactive_chat_reads_prompts_until_exit() {
    let server = mock_completion(
        200,
        json!({
            "id": "chatcmpl-2",
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "body { margin: 0; }"},
                "finish_reason": "stop"
            }]
        }),
    )
    .await;

    let dir = TempDir::new().unwrap();
    configure_endpoint(&dir, &server);

    webforge_cmd(&dir)
        .args(["chat"])
        .env("RUST_LOG", "webforge_cli=debug")
        .write_stdin("remove the page margin\n\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("applied to style.css"));

    let history = run_ok(&dir, &["--format", "json", "history"]);
    let messages: serde_json::Value = serde_json::from_str(&history).unwrap();
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[0]["content"], "remove the page margin");

    webforge_cmd(&dir)
        .args(["files", "show", "style.css"])
        .assert()
        .success()
        .stdout(predicate::str::contains("margin: 0"));
}
