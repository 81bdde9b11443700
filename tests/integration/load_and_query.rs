#![allow(missing_docs)]

use std::fs;

use authbench::bench::{
    catalog, BenchmarkRunner, RunState, RunnerOptions, LOAD_RESULTS_FILE, QUERY_RESULTS_FILE,
};
use authbench::export::{dataset_path, export_graph, DataFormat};
use authbench::generator::{generate, AuthGraph, GenerationConfig, RecordKind};
use authbench::store::{schema, GraphStore, QueryParams, ResultRow, SqliteStore, Value};
use tempfile::TempDir;

/// Small graph in which every kind, inheritance included, has records.
fn exported(formats: &[DataFormat]) -> (TempDir, AuthGraph) {
    let config = GenerationConfig {
        inheritance_probability: 1.0,
        ..GenerationConfig::small()
    };
    exported_with(&config, formats)
}

fn exported_with(config: &GenerationConfig, formats: &[DataFormat]) -> (TempDir, AuthGraph) {
    let dir = TempDir::new().expect("tempdir");
    let graph = generate(config).expect("generate");
    for &format in formats {
        export_graph(&graph, &dir.path().join("data"), format).expect("export");
    }
    (dir, graph)
}

#[test]
fn load_suite_counts_every_record() {
    let (dir, graph) = exported(&DataFormat::ALL);
    let mut runner = BenchmarkRunner::new(RunnerOptions::default());
    let results = runner.run_load_suite(
        &DataFormat::ALL,
        &dir.path().join("data"),
        &dir.path().join("db"),
        SqliteStore::open,
    );
    assert_eq!(results.len(), DataFormat::ALL.len());
    let expected = (graph.node_count() + graph.edge_count()) as u64;
    for result in &results {
        assert_eq!(result.state, RunState::Completed, "{}", result.format);
        assert!(result.skipped_tables.is_empty(), "{:?}", result.skipped_tables);
        assert_eq!(result.total_records, expected);
        assert_eq!(result.per_table_time.len(), RecordKind::ALL.len());
        assert_eq!(
            result.record_counts["MEMBER_OF"],
            graph.memberships.len() as u64
        );
        assert!(result.db_size_bytes > 0);
        assert!(result.throughput > 0.0);
    }
}

#[test]
fn missing_table_file_is_skipped_and_load_continues() {
    let (dir, graph) = exported(&[DataFormat::Csv]);
    let data = dir.path().join("data");
    fs::remove_file(dataset_path(&data, DataFormat::Csv, RecordKind::InheritsFrom)).unwrap();

    let mut runner = BenchmarkRunner::new(RunnerOptions::default());
    let result = runner
        .bench_load(DataFormat::Csv, &data, &dir.path().join("db"), SqliteStore::open)
        .unwrap();
    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.skipped_tables, vec!["INHERITS_FROM".to_string()]);
    assert_eq!(result.record_counts["INHERITS_FROM"], 0);
    assert_eq!(result.record_counts["User"], graph.users.len() as u64);
}

#[test]
fn absent_format_directory_skips_every_table() {
    let (dir, _) = exported(&[DataFormat::Json]);
    let data = dir.path().join("data");
    let mut runner = BenchmarkRunner::new(RunnerOptions::default());
    let results = runner.run_load_suite(
        &DataFormat::ALL,
        &data,
        &dir.path().join("db"),
        SqliteStore::open,
    );
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].format, DataFormat::Csv);
    assert_eq!(results[0].state, RunState::Skipped);
    assert_eq!(results[0].skipped_tables.len(), RecordKind::ALL.len());
    assert_eq!(results[1].state, RunState::Completed);
    assert!(results[1].skipped_tables.is_empty());
    assert_eq!(results[2].format, DataFormat::Parquet);
    assert_eq!(results[2].state, RunState::Skipped);
    assert!(!dir.path().join("db").join("csv").exists());
}

#[test]
fn reload_starts_from_an_empty_store() {
    let (dir, graph) = exported(&[DataFormat::Csv]);
    let data = dir.path().join("data");
    let db = dir.path().join("db");
    let mut runner = BenchmarkRunner::new(RunnerOptions::default());
    runner.bench_load(DataFormat::Csv, &data, &db, SqliteStore::open).unwrap();
    let second = runner
        .bench_load(DataFormat::Csv, &data, &db, SqliteStore::open)
        .unwrap();
    assert_eq!(second.record_counts["User"], graph.users.len() as u64);
}

#[test]
fn query_suite_runs_the_whole_catalog_and_saves_results() {
    let (dir, _) = exported(&[DataFormat::Csv]);
    let data = dir.path().join("data");
    let db = dir.path().join("db").join("csv");
    let mut runner = BenchmarkRunner::new(RunnerOptions {
        warmup: 2,
        ..RunnerOptions::default()
    });
    runner.bench_load(DataFormat::Csv, &data, &db, SqliteStore::open).unwrap();

    let mut store = SqliteStore::open_existing(&db).unwrap();
    let results = runner.run_query_suite(&mut store).unwrap();
    assert_eq!(results.len(), catalog().len());
    for (result, spec) in results.iter().zip(catalog()) {
        assert_eq!(result.name, spec.name);
        assert_eq!(result.iteration_count, spec.iterations);
        assert!(result.min <= result.p50 && result.p50 <= result.p95);
        assert!(result.p95 <= result.p99 && result.p99 <= result.max);
    }

    let results_dir = dir.path().join("results");
    let written = runner.save_results(&results_dir).unwrap();
    assert_eq!(written.len(), 2);
    assert!(results_dir.join(LOAD_RESULTS_FILE).exists());
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(results_dir.join(QUERY_RESULTS_FILE)).unwrap())
            .unwrap();
    assert_eq!(saved.as_array().unwrap().len(), catalog().len());
}

#[test]
fn owner_grants_read_back_as_full_permissions() {
    // Few users, so most resources grant their owner.
    let config = GenerationConfig {
        users: 5,
        resources: 40,
        groups: 4,
        ..GenerationConfig::default()
    };
    let (dir, graph) = exported_with(&config, &[DataFormat::Json]);
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.create_schema(&schema()).unwrap();
    for kind in RecordKind::ALL {
        let path = dataset_path(&dir.path().join("data"), DataFormat::Json, kind);
        store.bulk_load(kind.table(), &path).unwrap();
    }

    let owned = graph
        .user_permissions
        .iter()
        .find(|p| {
            graph
                .resources
                .iter()
                .any(|r| r.id == p.resource_id && r.owner_id == p.user_id)
        })
        .expect("at least one owner grant");

    let mut params = QueryParams::new();
    params.insert("user_id".into(), owned.user_id.clone());
    params.insert("resource_id".into(), owned.resource_id.clone());
    let spec = catalog()
        .iter()
        .find(|q| q.name == "Get All Permissions (User on Resource)")
        .unwrap();
    let mut rows = Vec::new();
    store
        .query(spec.sql, &params, &mut |row: &ResultRow| rows.push(row.to_vec()))
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(1); 4]]);
}
