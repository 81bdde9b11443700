#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    config: PathBuf,
}

impl Workspace {
    /// Temp directory with a config file pointing every path inside it.
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().to_path_buf();
        let config = root.join("authbench.toml");
        let body = format!(
            "formats = [\"csv\", \"json\"]\n\n\
             [generation]\nusers = 50\nresources = 30\ngroups = 8\n\n\
             [runner]\nwarmup = 1\nsample_size = 20\n\n\
             [paths]\ndata_dir = \"{}\"\ndb_dir = \"{}\"\nresults_dir = \"{}\"\n",
            root.join("data").display(),
            root.join("db").display(),
            root.join("results").display(),
        );
        fs::write(&config, body).expect("write config");
        Self {
            _dir: dir,
            root,
            config,
        }
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = cargo_bin_cmd!("authbench")
            .arg("--config")
            .arg(&self.config)
            .args(["--output", "json"])
            .args(args)
            .output()
            .expect("run authbench");
        assert!(
            output.status.success(),
            "authbench {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

fn files_under(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn generate_load_query_compare_round() {
    let ws = Workspace::new();

    let generated = ws.run_json(&["generate", "--verify", "--seed", "9"]);
    assert_eq!(generated["seed"], 9);
    assert_eq!(generated["verified"], true);
    assert!(generated["nodes"].as_u64().unwrap() >= 88);
    assert!(files_under(&ws.path("data/csv")) >= 5);
    assert!(files_under(&ws.path("data/json")) >= 5);

    let loads = ws.run_json(&["load"]);
    let loads = loads.as_array().unwrap();
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0]["format"], "csv");
    assert_eq!(loads[0]["record_counts"]["User"], 50);
    assert!(ws.path("results/loading_benchmark_results.json").exists());

    let queries = ws.run_json(&["query", "--format", "json"]);
    assert_eq!(queries.as_array().unwrap().len(), 10);
    assert!(ws.path("results/query_benchmark_results.json").exists());

    let results = ws.path("results");
    let run = format!("native={}", results.display());
    let again = format!("again={}", results.display());
    let report = ws.run_json(&[
        "compare",
        "--run",
        &run,
        "--run",
        &again,
        "--footprint",
        "again=1024",
    ]);
    assert_eq!(report["baseline"], "native");
    assert_eq!(report["runs"].as_array().unwrap().len(), 2);
    assert_eq!(report["formats"].as_array().unwrap().len(), 2);
    assert_eq!(report["queries"].as_array().unwrap().len(), 10);
    assert_eq!(report["winners"]["footprint"], "again");
}

#[test]
fn parquet_round_through_load_and_compare() {
    let ws = Workspace::new();
    ws.run_json(&["generate", "--format", "csv", "--format", "parquet"]);
    assert!(ws.path("data/parquet/users.parquet").exists());

    let loads = ws.run_json(&["load", "--format", "csv", "--format", "parquet"]);
    let loads = loads.as_array().unwrap();
    assert_eq!(loads[1]["format"], "parquet");
    assert_eq!(loads[1]["state"], "completed");
    assert_eq!(loads[1]["record_counts"]["User"], 50);

    let queries = ws.run_json(&["query", "--format", "parquet"]);
    assert_eq!(queries.as_array().unwrap().len(), 10);

    let run = format!("native={}", ws.path("results").display());
    let report = ws.run_json(&["compare", "--run", &run, "--candidate-format", "parquet"]);
    let formats = report["formats"].as_array().unwrap();
    assert_eq!(formats.len(), 1);
    assert_eq!(formats[0]["candidate"], "parquet");
}

#[test]
fn load_without_any_dataset_fails() {
    let ws = Workspace::new();
    let output = cargo_bin_cmd!("authbench")
        .arg("--config")
        .arg(&ws.config)
        .args(["--output", "json", "load"])
        .output()
        .expect("run authbench");
    assert!(!output.status.success());
    let loads: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert!(loads
        .as_array()
        .unwrap()
        .iter()
        .all(|l| l["state"] == "skipped"));
}

#[test]
fn flags_override_config_paths() {
    let ws = Workspace::new();
    let out = ws.path("elsewhere");
    let generated = ws.run_json(&[
        "generate",
        "--users",
        "12",
        "--resources",
        "0",
        "--groups",
        "0",
        "--format",
        "json",
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(generated["nodes"], 12);
    assert_eq!(generated["edges"], 0);
    assert_eq!(generated["files"].as_array().unwrap().len(), 1);
    assert!(out.join("json/users.json").exists());
    assert!(!ws.path("data").exists());
}

#[test]
fn query_without_a_loaded_store_fails() {
    let ws = Workspace::new();
    let output = cargo_bin_cmd!("authbench")
        .arg("--config")
        .arg(&ws.config)
        .arg("query")
        .output()
        .expect("run authbench");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn compare_requires_a_run() {
    cargo_bin_cmd!("authbench")
        .arg("compare")
        .assert()
        .failure();
}

#[test]
fn compare_rejects_malformed_run() {
    let output = cargo_bin_cmd!("authbench")
        .args(["compare", "--run", "no-separator"])
        .output()
        .expect("run authbench");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LABEL=DIR"));
}
