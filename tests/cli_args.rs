//! Integration tests for CLI argument handling
//!
//! Runs the built binary against a throwaway cache directory, using a shell
//! `echo` as the data source.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const RECORDS: &str = r#"[
  {"name": "llama3:latest", "total_weights_size": 4.7, "template": ["{{ .Prompt }}"],
   "weights": [{"hash": "6a0746a1ec1a", "file_path": "/blobs/sha256-6a0746a1ec1a", "dir": "/blobs"}]},
  {"name": "mistral:7b", "total_weights_size": 4.1, "template": ["[INST]"],
   "weights": [{"hash": "14f2aa8c1d9e", "file_path": "/blobs/sha256-14f2aa8c1d9e", "dir": "/blobs"}]}
]"#;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ollama-data"))
        .args(args)
        .env_remove("OLLAMA_DATA_CACHE_PATH")
        .env_remove("OLLAMA_DATA_CACHE_TIME")
        .env_remove("OLLAMA_DATA_SOURCE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute ollama-data")
}

fn source_command() -> String {
    format!("echo '{}'", RECORDS.replace('\n', " "))
}

fn cache_file(dir: &TempDir) -> PathBuf {
    dir.path().join("cache").join("models.json")
}

/// Runs a search against a cache in `dir`, regenerating from the echo source
fn run_search(dir: &TempDir, args: &[&str]) -> std::process::Output {
    let cache = cache_file(dir);
    let source = source_command();
    let mut full = vec!["--cache-path", path_str(&cache), "--source", source.as_str()];
    full.extend_from_slice(args);
    run_cli(&full)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ollama-data"), "Help should mention ollama-data");
    assert!(stdout.contains("--regex"), "Help should mention --regex flag");
    assert!(stdout.contains("--exclude"), "Help should mention --exclude flag");
}

#[test]
fn test_schema_prints_record_shape() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--cache-path", path_str(&cache_file(&dir)), "--schema"]);

    assert!(output.status.success());
    let schema = stdout_json(&output);
    assert_eq!(schema[0]["name"], "<str>");
    assert!(!cache_file(&dir).exists(), "--schema should not touch the cache");
}

#[test]
fn test_invalid_cache_time_exits_with_config_code() {
    let output = run_cli(&["--cache-path", "/tmp/unused.json", "--cache-time", "eventually"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("eventually"), "Should name the bad duration: {}", stderr);
}

#[test]
fn test_invalid_regex_exits_with_config_code() {
    let output = run_cli(&["--cache-path", "/tmp/unused.json", "--regex", "(unclosed"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("regex"), "Should mention the regex: {}", stderr);
}

#[test]
fn test_invalid_exclude_exits_with_config_code() {
    let output = run_cli(&["--cache-path", "/tmp/unused.json", "--exclude", "[abc]"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_source_on_empty_cache_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--cache-path", path_str(&cache_file(&dir))]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--source"), "Should point at --source: {}", stderr);
}

#[cfg(unix)]
#[test]
fn test_query_projects_names() {
    let dir = TempDir::new().unwrap();

    let output = run_search(&dir, &["[*].name"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output), serde_json::json!(["llama3:latest", "mistral:7b"]));
    assert!(cache_file(&dir).exists(), "Search should populate the cache");
}

#[cfg(unix)]
#[test]
fn test_regex_and_exclude_flags() {
    let dir = TempDir::new().unwrap();

    let output = run_search(
        &dir,
        &[
            "--regex",
            "14f2",
            "--regex-path",
            "weights[*].hash",
            "--exclude",
            "[*].template",
            "--exclude",
            "[*].weights.[*].dir",
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let result = stdout_json(&output);
    let models = result.as_array().unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["name"], "mistral:7b");
    assert!(models[0].get("template").is_none());
    assert!(models[0]["weights"][0].get("dir").is_none());
    assert_eq!(models[0]["weights"][0]["hash"], "14f2aa8c1d9e");
}

#[cfg(unix)]
#[test]
fn test_valid_cache_is_reused_without_source() {
    let dir = TempDir::new().unwrap();
    assert!(run_search(&dir, &["length(@)"]).status.success());

    // A failing source proves the second run never regenerates
    let output = run_cli(&[
        "--cache-path",
        path_str(&cache_file(&dir)),
        "--source",
        "exit 1",
        "length(@)",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output).as_f64(), Some(2.0));
}

#[cfg(unix)]
#[test]
fn test_cache_info_and_clear() {
    let dir = TempDir::new().unwrap();
    let cache = cache_file(&dir);
    assert!(run_search(&dir, &["--cache-time", "2 hours"]).status.success());

    let info = run_cli(&[
        "--cache-path",
        path_str(&cache),
        "--cache-time",
        "2 hours",
        "--cache-info",
    ]);
    assert!(info.status.success());
    let info = stdout_json(&info);
    assert_eq!(info["valid"], true);
    assert_eq!(info["ttl_seconds"], 7200);
    assert!(info["time_remaining_seconds"].as_i64().unwrap() > 0);

    let cleared = run_cli(&["--cache-path", path_str(&cache), "--clear-cache"]);
    assert!(cleared.status.success());
    assert!(!cache.exists());
}

#[cfg(unix)]
#[test]
fn test_unknown_export_model_exits_with_lookup_code() {
    let dir = TempDir::new().unwrap();
    let outdir = dir.path().join("export");

    let output = run_search(&dir, &["--export", path_str(&outdir), "--models", "qwen"]);

    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("qwen"), "Should name the missing model: {}", stderr);
}

#[cfg(unix)]
#[test]
fn test_export_writes_metadata() {
    let dir = TempDir::new().unwrap();
    let outdir = dir.path().join("export");

    let output = run_search(&dir, &["--export", path_str(&outdir), "--models", "mistral"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let meta = std::fs::read_to_string(outdir.join("mistral:7b.json")).unwrap();
    let meta: Value = serde_json::from_str(&meta).unwrap();
    assert_eq!(meta["name"], "mistral:7b");
    // The weight blob does not exist but the dangling link is still created
    assert!(std::fs::symlink_metadata(outdir.join("mistral:7b_14f2aa8c")).is_ok());
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use ollama_data::cli::{Cli, Mode, QueryConfig};

    #[test]
    fn test_cli_no_args_has_no_query() {
        let cli = Cli::parse_from(["ollama-data"]);
        assert!(cli.query.is_none());
        assert!(!cli.schema);
    }

    #[test]
    fn test_cli_repeated_exclude() {
        let cli = Cli::parse_from(["ollama-data", "--exclude", "a", "--exclude", "b.[0]"]);
        assert_eq!(cli.exclude, ["a", "b.[0]"]);
    }

    #[test]
    fn test_config_from_cli_search() {
        let cli = Cli::parse_from(["ollama-data", "--cache-path", "/tmp/c.json", "[*].name"]);
        let config = QueryConfig::from_cli(&cli).unwrap();
        assert!(matches!(config.mode, Mode::Search));
        assert_eq!(config.query.as_deref(), Some("[*].name"));
    }

    #[test]
    fn test_config_from_cli_invalid_regex() {
        let cli = Cli::parse_from([
            "ollama-data",
            "--cache-path",
            "/tmp/c.json",
            "--regex",
            "[z-a]",
        ]);
        assert!(QueryConfig::from_cli(&cli).is_err());
    }
}
