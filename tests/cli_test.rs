//! Command-line Tests
//!
//! Runs the `repodrop` binary end to end against a mock Contents API.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upload_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(b"hello from repodrop").unwrap();
    file
}

#[test]
fn test_help_lists_options() {
    Command::cargo_bin("repodrop")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-clipboard"))
        .stdout(predicate::str::contains("<FILE>"));
}

#[test]
fn test_missing_file_fails() {
    Command::cargo_bin("repodrop")
        .unwrap()
        .arg("/nonexistent/repodrop-input.bin")
        .env("REPODROP_API_BASE", "http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_successful_upload_prints_link() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "content": {
                "name": "f.txt",
                "path": "text/plain/f.txt",
                "sha": "abc",
                "download_url": "https://raw.githubusercontent.com/octocat/drops/main/text/plain/f.txt"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let file = upload_file();
    let uri = mock_server.uri();
    let path = file.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("repodrop")
            .unwrap()
            .arg(&path)
            .arg("--no-clipboard")
            .env("REPODROP_TOKEN", "ghp_test")
            .env("REPODROP_OWNER", "octocat")
            .env("REPODROP_REPO", "drops")
            .env("REPODROP_API_BASE", uri)
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout(predicate::str::contains(
        "https://raw.githubusercontent.com/octocat/drops/main/text/plain/f.txt",
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_upload_exits_with_guidance() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&mock_server)
        .await;

    let file = upload_file();
    let uri = mock_server.uri();
    let path = file.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("repodrop")
            .unwrap()
            .arg(&path)
            .arg("--no-clipboard")
            .env("REPODROP_OWNER", "octocat")
            .env("REPODROP_REPO", "drops")
            .env("REPODROP_API_BASE", uri)
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(2)
        .stderr(predicate::str::contains("That's a big file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_credentials_exit_with_single_error_notice() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let file = upload_file();
    let uri = mock_server.uri();
    let path = file.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("repodrop")
            .unwrap()
            .arg(&path)
            .arg("--no-clipboard")
            .env("REPODROP_TOKEN", "ghp_revoked")
            .env("REPODROP_OWNER", "octocat")
            .env("REPODROP_REPO", "drops")
            .env("REPODROP_API_BASE", uri)
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "✖ Request failed with status code 401: Bad credentials",
        ))
        .stderr(predicate::function(|stderr: &str| {
            stderr.matches('✖').count() == 1
        }));
}
