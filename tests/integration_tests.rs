//! Integration tests for rpchat
//!
//! These tests drive the binary end to end: configuration, persona listing,
//! startup validation of `chat`, and `compress` against a local mock provider.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create an rpchat Command isolated from the caller's environment
fn rpchat(data_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("rpchat");
    cmd.current_dir(data_dir)
        .arg("--data-dir")
        .arg(data_dir)
        .env_remove("MINIMAX_API_KEY")
        .env_remove("RPCHAT_ENDPOINT")
        .env_remove("RPCHAT_MODEL")
        .env_remove("RPCHAT_COMPRESS_MODEL")
        .env_remove("RPCHAT_TOKEN_THRESHOLD")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a data directory with two personas
fn create_data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let characters = dir.path().join("characters");
    fs::create_dir_all(&characters).unwrap();
    fs::write(
        characters.join("alice.json"),
        json!({ "name": "Alice", "setting": "An innkeeper.", "opening": "Welcome." }).to_string(),
    )
    .unwrap();
    fs::write(
        characters.join("bob.json"),
        json!({ "name": "Bob", "setting": "A traveller." }).to_string(),
    )
    .unwrap();
    dir
}

/// Helper to write a saved session with `n` transcript lines
fn write_session(dir: &Path, n: usize) -> std::path::PathBuf {
    let transcript: Vec<_> = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                json!({ "role": "assistant", "name": "Alice", "content": format!("reply {}", i) })
            } else {
                json!({ "role": "user", "name": "Bob", "content": format!("line {}", i) })
            }
        })
        .collect();
    let path = dir.join("sessions").join("1700000000000.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        json!({
            "characterId": "alice",
            "selfId": "bob",
            "memoryDigest": [],
            "archivedLog": [],
            "transcript": transcript,
        })
        .to_string(),
    )
    .unwrap();
    path
}

fn minimax_reply(content: &str) -> serde_json::Value {
    json!({
        "base_resp": { "status_code": 0, "status_msg": "" },
        "choices": [{ "message": { "role": "assistant", "name": "Narrator", "content": content } }],
        "usage": { "total_tokens": 321 }
    })
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_rpchat_help() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("chat"))
            .stdout(predicate::str::contains("compress"));
    }

    #[test]
    fn test_rpchat_version() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path()).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path()).arg("dance").assert().failure();
    }

    #[test]
    fn test_load_and_save_conflict() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path())
            .args(["chat", "--load", "a.json", "--save", "b.json"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No rpchat.toml found"))
            .stdout(predicate::str::contains("token_threshold = 7000"))
            .stdout(predicate::str::contains("API key: missing"));
    }

    #[test]
    fn test_config_init_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let content = fs::read_to_string(dir.path().join("rpchat.toml")).unwrap();
        assert!(content.contains("[compaction]"));
        assert!(content.contains("summary_length = 300"));

        rpchat(dir.path())
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_show_reflects_file_and_env() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rpchat.toml"),
            "[chat]\nnarrator = \"Storyteller\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("apikey.json"), "\"sk-test\"").unwrap();

        rpchat(dir.path())
            .env("RPCHAT_MODEL", "abab5.5-chat")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("narrator = \"Storyteller\""))
            .stdout(predicate::str::contains("model = \"abab5.5-chat\""))
            .stdout(predicate::str::contains("API key: found"))
            .stdout(predicate::str::contains("sk-test").not());
    }
}

// =============================================================================
// Persona Tests
// =============================================================================

mod characters {
    use super::*;

    #[test]
    fn test_characters_lists_personas() {
        let dir = create_data_dir();
        rpchat(dir.path())
            .arg("characters")
            .assert()
            .success()
            .stdout(predicate::str::contains("alice"))
            .stdout(predicate::str::contains("Bob"));
    }

    #[test]
    fn test_characters_reports_broken_file() {
        let dir = create_data_dir();
        fs::write(dir.path().join("characters/broken.json"), "{ not json").unwrap();
        rpchat(dir.path())
            .arg("characters")
            .assert()
            .success()
            .stdout(predicate::str::contains("broken"));
    }

    #[test]
    fn test_characters_without_directory() {
        let dir = TempDir::new().unwrap();
        rpchat(dir.path())
            .arg("characters")
            .assert()
            .success()
            .stdout(predicate::str::contains("No characters found"));
    }
}

// =============================================================================
// Chat Startup Tests
// =============================================================================

mod chat_startup {
    use super::*;

    #[test]
    fn test_chat_requires_api_key() {
        let dir = create_data_dir();
        rpchat(dir.path())
            .args(["chat", "--character", "alice"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No API key found"));
    }

    #[test]
    fn test_chat_requires_character_for_new_session() {
        let dir = create_data_dir();
        rpchat(dir.path())
            .env("MINIMAX_API_KEY", "sk-test")
            .arg("chat")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--character is required"));
    }

    #[test]
    fn test_chat_unknown_character_fails() {
        let dir = create_data_dir();
        rpchat(dir.path())
            .env("MINIMAX_API_KEY", "sk-test")
            .args(["chat", "--character", "nobody"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("persona file"));
    }

    #[test]
    fn test_chat_load_rejects_other_character() {
        let dir = create_data_dir();
        let session = write_session(dir.path(), 3);
        rpchat(dir.path())
            .env("MINIMAX_API_KEY", "sk-test")
            .args(["chat", "--character", "bob", "--load"])
            .arg(&session)
            .assert()
            .failure()
            .stderr(predicate::str::contains("belongs to character 'alice'"));
    }
}

// =============================================================================
// Compress Tests
// =============================================================================

mod compress {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_compress_missing_file_fails() {
        let dir = create_data_dir();
        rpchat(dir.path())
            .env("MINIMAX_API_KEY", "sk-test")
            .args(["compress", "missing.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read session file"));
    }

    #[test]
    fn test_compress_without_api_key_fails() {
        let dir = create_data_dir();
        let session = write_session(dir.path(), 4);
        rpchat(dir.path())
            .arg("compress")
            .arg(&session)
            .assert()
            .failure()
            .stderr(predicate::str::contains("MINIMAX_API_KEY"));
    }

    #[tokio::test]
    async fn test_compress_prints_digest_and_leaves_file_alone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text/chatcompletion_v2"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "abab6.5s-chat" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(minimax_reply("Alice and Bob met at the inn.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = create_data_dir();
        let session = write_session(dir.path(), 6);
        let before = fs::read_to_string(&session).unwrap();
        let endpoint = format!("{}/v1/text/chatcompletion_v2", server.uri());
        let data_dir = dir.path().to_path_buf();
        let session_path = session.clone();

        tokio::task::spawn_blocking(move || {
            rpchat(&data_dir)
                .env("MINIMAX_API_KEY", "sk-test")
                .env("RPCHAT_ENDPOINT", endpoint)
                .arg("compress")
                .arg(&session_path)
                .assert()
                .success()
                .stdout(predicate::str::contains("Alice and Bob met at the inn."))
                .stdout(predicate::str::contains("6 lines"));
        })
        .await
        .unwrap();

        assert_eq!(fs::read_to_string(&session).unwrap(), before);
    }

    #[tokio::test]
    async fn test_compress_reports_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "base_resp": { "status_code": 1004, "status_msg": "authentication failed" }
            })))
            .mount(&server)
            .await;

        let dir = create_data_dir();
        let session = write_session(dir.path(), 4);
        let endpoint = server.uri();
        let data_dir = dir.path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            rpchat(&data_dir)
                .env("MINIMAX_API_KEY", "sk-test")
                .env("RPCHAT_ENDPOINT", endpoint)
                .arg("compress")
                .arg(&session)
                .assert()
                .failure()
                .stderr(predicate::str::contains("1004"));
        })
        .await
        .unwrap();
    }
}
