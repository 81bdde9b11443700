#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use authbench::bench::{LoadResult, RunState, QueryResult, LOAD_RESULTS_FILE, QUERY_RESULTS_FILE};
use authbench::compare::{CrossRunAggregator, RunSet};
use authbench::export::DataFormat;
use authbench::BenchError;
use tempfile::TempDir;

fn load(format: DataFormat, total_time: f64, memory_delta_mb: f64) -> LoadResult {
    LoadResult {
        format,
        state: RunState::Completed,
        schema_time: 0.01,
        per_table_time: BTreeMap::new(),
        skipped_tables: Vec::new(),
        total_time,
        db_size_bytes: 4096,
        memory_delta_mb,
        record_counts: BTreeMap::new(),
        total_records: 1000,
        throughput: 1000.0 / total_time,
    }
}

fn query(name: &str, average: f64) -> QueryResult {
    QueryResult {
        name: name.to_string(),
        query: "SELECT 1".to_string(),
        iteration_count: 10,
        total_time: average * 10.0 / 1000.0,
        average,
        min: average / 2.0,
        max: average * 2.0,
        p50: average,
        p95: average * 1.5,
        p99: average * 1.8,
        result_row_count: 10,
    }
}

fn write_run(dir: &Path, loads: Option<&[LoadResult]>, queries: Option<&[QueryResult]>) {
    fs::create_dir_all(dir).unwrap();
    if let Some(loads) = loads {
        fs::write(dir.join(LOAD_RESULTS_FILE), serde_json::to_string(loads).unwrap()).unwrap();
    }
    if let Some(queries) = queries {
        fs::write(dir.join(QUERY_RESULTS_FILE), serde_json::to_string(queries).unwrap()).unwrap();
    }
}

#[test]
fn format_comparison_within_a_run() {
    let run = RunSet {
        loading: Some(vec![
            load(DataFormat::Csv, 10.0, 100.0),
            load(DataFormat::Json, 7.0, 15.0),
        ]),
        ..RunSet::new("native")
    };
    let report = CrossRunAggregator::default().aggregate(&[run]).unwrap();
    assert_eq!(report.formats.len(), 1);
    let cmp = &report.formats[0];
    assert!((cmp.load_speedup_pct.unwrap() - 30.0).abs() < 1e-9);
    assert!((cmp.memory_reduction_pct.unwrap() - 85.0).abs() < 1e-9);
    assert!(report.loads.is_empty());
    assert!(report.queries.is_empty());
}

#[test]
fn runs_from_disk_with_missing_files_are_partial() {
    let tmp = TempDir::new().unwrap();
    let native = tmp.path().join("native");
    let wasm = tmp.path().join("wasm");
    write_run(
        &native,
        Some(&[load(DataFormat::Csv, 2.0, 50.0)]),
        Some(&[query("Direct", 1.0), query("Groups", 4.0)]),
    );
    write_run(&wasm, None, Some(&[query("Direct", 3.0), query("Only wasm", 1.0)]));

    let runs = vec![
        RunSet::from_dir("native", &native).unwrap().with_footprint(2_000_000),
        RunSet::from_dir("wasm", &wasm).unwrap().with_footprint(900_000),
    ];
    assert!(runs[1].loading.is_none());

    let report = CrossRunAggregator::default().aggregate(&runs).unwrap();
    assert_eq!(report.baseline, "native");
    assert!(report.formats.is_empty());
    assert!(report.loads.is_empty());

    assert_eq!(report.queries.len(), 1);
    let direct = &report.queries[0];
    assert_eq!(direct.name, "Direct");
    assert_eq!(direct.winner.as_deref(), Some("native"));
    assert!((direct.improvement_pct["wasm"] + 200.0).abs() < 1e-9);

    assert_eq!(report.runs[0].avg_query_ms, Some(2.5));
    assert_eq!(report.runs[1].best_load_time, None);
    assert_eq!(report.winners.load_speed.as_deref(), Some("native"));
    assert_eq!(report.winners.footprint.as_deref(), Some("wasm"));
    assert_eq!(report.winners.query_speed.as_deref(), Some("wasm"));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["queries"][0].get("winner").is_some());
}

#[test]
fn cross_run_load_comparison() {
    let a = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 4.0, 10.0)]),
        ..RunSet::new("a")
    };
    let b = RunSet {
        loading: Some(vec![
            load(DataFormat::Csv, 5.0, 8.0),
            load(DataFormat::Json, 1.0, 8.0),
        ]),
        ..RunSet::new("b")
    };
    let report = CrossRunAggregator::default().aggregate(&[a, b]).unwrap();
    assert_eq!(report.loads.len(), 1);
    let l = &report.loads[0];
    assert_eq!(l.format, DataFormat::Csv);
    assert!((l.improvement_pct.unwrap() + 25.0).abs() < 1e-9);
    assert!((l.slowdown.unwrap() - 1.25).abs() < 1e-9);
    assert!((l.memory_reduction_pct.unwrap() - 20.0).abs() < 1e-9);
    assert_eq!(report.winners.memory.as_deref(), Some("b"));
}

#[test]
fn cross_run_load_reports_time_and_memory_gains() {
    let native = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 10.0, 100.0)]),
        ..RunSet::new("native")
    };
    let wasm = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 7.0, 15.0)]),
        ..RunSet::new("wasm")
    };
    let report = CrossRunAggregator::default().aggregate(&[native, wasm]).unwrap();
    let l = &report.loads[0];
    assert_eq!(l.run, "wasm");
    assert!((l.improvement_pct.unwrap() - 30.0).abs() < 1e-9);
    assert!((l.memory_reduction_pct.unwrap() - 85.0).abs() < 1e-9);

    let json = serde_json::to_value(&report.loads).unwrap();
    assert!((json[0]["memory_reduction_pct"].as_f64().unwrap() - 85.0).abs() < 1e-9);
}

#[test]
fn zero_baseline_memory_omits_the_reduction() {
    let a = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 1.0, 0.0)]),
        ..RunSet::new("a")
    };
    let b = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 1.0, 3.0)]),
        ..RunSet::new("b")
    };
    let report = CrossRunAggregator::default().aggregate(&[a, b]).unwrap();
    assert_eq!(report.loads[0].memory_reduction_pct, None);
    let json = serde_json::to_value(&report.loads[0]).unwrap();
    assert!(json.get("memory_reduction_pct").is_none());
}

#[test]
fn skipped_loads_never_win() {
    let mut skipped = load(DataFormat::Json, 0.0, 0.0);
    skipped.state = RunState::Skipped;
    skipped.throughput = 0.0;
    let run = RunSet {
        loading: Some(vec![load(DataFormat::Csv, 3.0, 12.0), skipped]),
        ..RunSet::new("native")
    };
    let report = CrossRunAggregator::default().aggregate(&[run]).unwrap();
    assert!(report.formats.is_empty());
    assert_eq!(report.runs[0].best_load_time, Some(3.0));
    assert_eq!(report.runs[0].best_load_format, Some(DataFormat::Csv));
    assert_eq!(report.runs[0].min_memory_mb, Some(12.0));
}

#[test]
fn missing_run_directory_is_missing_input() {
    let tmp = TempDir::new().unwrap();
    let err = RunSet::from_dir("gone", &tmp.path().join("gone")).unwrap_err();
    assert!(matches!(err, BenchError::MissingInput(_)));
}

#[test]
fn no_runs_is_invalid() {
    assert!(matches!(
        CrossRunAggregator::default().aggregate(&[]),
        Err(BenchError::InvalidArgument(_))
    ));
}
