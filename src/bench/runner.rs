//! Warmup-then-measure benchmark execution.

use std::collections::BTreeMap;
use std::fs;
use std::hint::black_box;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::memory::{directory_size, MemoryTracker};
use super::queries::{catalog, generate_params, params_rng, SampleIds};
use super::RunState;
use crate::error::{BenchError, Result};
use crate::export::{dataset_path, DataFormat};
use crate::generator::RecordKind;
use crate::stats::LatencyStats;
use crate::store::{schema, GraphStore, QueryParams, ResultRow};

/// File name of persisted load results.
pub const LOAD_RESULTS_FILE: &str = "loading_benchmark_results.json";
/// File name of persisted query results.
pub const QUERY_RESULTS_FILE: &str = "query_benchmark_results.json";

/// Knobs of a benchmark session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Upper bound on discarded warmup iterations per query.
    pub warmup: usize,
    /// Seed for id sampling and parameter generation.
    pub seed: u64,
    /// Number of user and resource ids sampled from the store.
    pub sample_size: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            warmup: 5,
            seed: 42,
            sample_size: 100,
        }
    }
}

/// Measured latency of one query over its parameter sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Query name.
    pub name: String,
    /// Query text.
    pub query: String,
    /// Measured iterations, one per parameter set.
    pub iteration_count: usize,
    /// Sum of measured iterations, in seconds.
    pub total_time: f64,
    /// Mean latency, ms.
    pub average: f64,
    /// Fastest iteration, ms.
    pub min: f64,
    /// Slowest iteration, ms.
    pub max: f64,
    /// Median latency, ms.
    pub p50: f64,
    /// 95th percentile latency, ms.
    pub p95: f64,
    /// 99th percentile latency, ms.
    pub p99: f64,
    /// Rows returned over all measured iterations.
    pub result_row_count: u64,
}

impl QueryResult {
    fn from_stats(name: &str, query: &str, stats: &LatencyStats, rows: u64) -> Self {
        Self {
            name: name.to_string(),
            query: query.to_string(),
            iteration_count: stats.count,
            total_time: stats.total_ms / 1000.0,
            average: stats.mean_ms,
            min: stats.min_ms,
            max: stats.max_ms,
            p50: stats.p50_ms,
            p95: stats.p95_ms,
            p99: stats.p99_ms,
            result_row_count: rows,
        }
    }
}

/// Outcome of bulk-loading one dataset format into a fresh store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    /// Dataset format loaded.
    pub format: DataFormat,
    /// `Completed`, or `Skipped` when no dataset file of the format existed.
    #[serde(default = "completed")]
    pub state: RunState,
    /// Schema creation time, seconds.
    pub schema_time: f64,
    /// Load time per table, seconds.
    pub per_table_time: BTreeMap<String, f64>,
    /// Tables whose source file was absent.
    pub skipped_tables: Vec<String>,
    /// Time spent loading every table, seconds; excludes schema creation.
    pub total_time: f64,
    /// Store directory size after loading.
    pub db_size_bytes: u64,
    /// Resident memory growth during the load, MiB.
    pub memory_delta_mb: f64,
    /// Rows per table after loading.
    pub record_counts: BTreeMap<String, u64>,
    /// Sum of `record_counts`.
    pub total_records: u64,
    /// `total_records / total_time`; zero when no time elapsed.
    pub throughput: f64,
}

fn completed() -> RunState {
    RunState::Completed
}

impl LoadResult {
    /// Result of a format with no dataset file at all.
    fn skipped(format: DataFormat) -> Self {
        let tables = RecordKind::ALL.iter().map(|kind| kind.table().to_string());
        Self {
            format,
            state: RunState::Skipped,
            schema_time: 0.0,
            per_table_time: BTreeMap::new(),
            skipped_tables: tables.clone().collect(),
            total_time: 0.0,
            db_size_bytes: 0,
            memory_delta_mb: 0.0,
            record_counts: tables.map(|table| (table, 0)).collect(),
            total_records: 0,
            throughput: 0.0,
        }
    }

    /// True when the load actually ran.
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Runs benchmarks and accumulates their results.
#[derive(Debug, Default)]
pub struct BenchmarkRunner {
    options: RunnerOptions,
    /// Completed query benchmarks, in run order.
    pub query_results: Vec<QueryResult>,
    /// Completed load benchmarks, in run order.
    pub load_results: Vec<LoadResult>,
}

impl BenchmarkRunner {
    /// Runner with `options`.
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            query_results: Vec::new(),
            load_results: Vec::new(),
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Benchmarks `query` once per parameter set after a short warmup.
    ///
    /// Warmup runs the first `min(warmup, params.len())` sets and discards
    /// their rows. Each measured iteration times submission plus consumption
    /// of every row. With no parameter sets the run is skipped and `None` is
    /// returned.
    pub fn bench_query<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        query: &str,
        params: &[QueryParams],
    ) -> Result<Option<QueryResult>> {
        let mut state = RunState::Idle;
        if params.is_empty() {
            state = state.transition(RunState::Skipped)?;
            warn!(query = name, %state, "bench.query.skipped");
            return Ok(None);
        }

        state = state.transition(RunState::WarmingUp)?;
        let warmup = self.options.warmup.min(params.len());
        for set in &params[..warmup] {
            store.query(query, set, &mut |row: &ResultRow| {
                black_box(row);
            })?;
        }

        state = state.transition(RunState::Measuring)?;
        let mut samples = Vec::with_capacity(params.len());
        let mut rows = 0u64;
        for set in params {
            let start = Instant::now();
            let n = store.query(query, set, &mut |row: &ResultRow| {
                black_box(row);
            })?;
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
            rows += n;
        }

        let stats = LatencyStats::from_samples(&samples)?;
        state = state.transition(RunState::Completed)?;
        let result = QueryResult::from_stats(name, query, &stats, rows);
        info!(
            query = name,
            %state,
            iterations = result.iteration_count,
            avg_ms = result.average,
            p95_ms = result.p95,
            rows = result.result_row_count,
            "bench.query.completed"
        );
        self.query_results.push(result.clone());
        Ok(Some(result))
    }

    /// Loads every table of `format` from `data_dir` into a fresh store at
    /// `db_dir`, opened through `open`.
    ///
    /// Any previous content of `db_dir` is removed first. Schema creation is
    /// the warmup phase and the table loads are the measured phase. Tables
    /// whose source file is missing are recorded in `skipped_tables`; when
    /// every file is missing the load is `Skipped` and no store is opened.
    pub fn bench_load<S, F>(
        &mut self,
        format: DataFormat,
        data_dir: &Path,
        db_dir: &Path,
        open: F,
    ) -> Result<LoadResult>
    where
        S: GraphStore,
        F: FnOnce(&Path) -> Result<S>,
    {
        let mut state = RunState::Idle;
        let any_input = RecordKind::ALL
            .iter()
            .any(|&kind| dataset_path(data_dir, format, kind).exists());
        if !any_input {
            state = state.transition(RunState::Skipped)?;
            warn!(format = %format, dir = %data_dir.display(), %state, "bench.load.skipped");
            let result = LoadResult::skipped(format);
            self.load_results.push(result.clone());
            return Ok(result);
        }

        if db_dir.exists() {
            fs::remove_dir_all(db_dir)?;
        }
        fs::create_dir_all(db_dir)?;

        let memory = MemoryTracker::new();
        let mut store = open(db_dir)?;

        state = state.transition(RunState::WarmingUp)?;
        let start = Instant::now();
        store.create_schema(&schema())?;
        let schema_time = start.elapsed().as_secs_f64();

        state = state.transition(RunState::Measuring)?;
        let mut per_table_time = BTreeMap::new();
        let mut skipped_tables = Vec::new();
        let load_start = Instant::now();
        for kind in RecordKind::ALL {
            let path = dataset_path(data_dir, format, kind);
            let start = Instant::now();
            match store.bulk_load(kind.table(), &path) {
                Ok(rows) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    per_table_time.insert(kind.table().to_string(), elapsed);
                    info!(table = %kind, rows, seconds = elapsed, "bench.load.table_loaded");
                }
                Err(BenchError::MissingInput(missing)) => {
                    warn!(table = %kind, path = %missing.display(), "bench.load.table_skipped");
                    skipped_tables.push(kind.table().to_string());
                }
                Err(err) => return Err(err),
            }
        }
        let total_time = load_start.elapsed().as_secs_f64();
        let memory_delta_mb = memory.delta_mb();

        let mut record_counts = BTreeMap::new();
        for kind in RecordKind::ALL {
            record_counts.insert(kind.table().to_string(), store.count(kind.table())?);
        }
        drop(store);

        let total_records: u64 = record_counts.values().sum();
        state = state.transition(RunState::Completed)?;
        let result = LoadResult {
            format,
            state,
            schema_time,
            per_table_time,
            skipped_tables,
            total_time,
            db_size_bytes: directory_size(db_dir)?,
            memory_delta_mb,
            record_counts,
            total_records,
            throughput: if total_time > 0.0 {
                total_records as f64 / total_time
            } else {
                0.0
            },
        };
        info!(
            format = %format,
            %state,
            seconds = result.total_time,
            records = result.total_records,
            throughput = result.throughput,
            db_size_bytes = result.db_size_bytes,
            "bench.load.completed"
        );
        self.load_results.push(result.clone());
        Ok(result)
    }

    /// Loads each of `formats` into `<db_root>/<format>`.
    ///
    /// A failing format is logged and the suite moves on to the next one.
    pub fn run_load_suite<S, F>(
        &mut self,
        formats: &[DataFormat],
        data_dir: &Path,
        db_root: &Path,
        mut open: F,
    ) -> Vec<LoadResult>
    where
        S: GraphStore,
        F: FnMut(&Path) -> Result<S>,
    {
        let mut results = Vec::with_capacity(formats.len());
        for &format in formats {
            let db_dir = db_root.join(format.extension());
            match self.bench_load(format, data_dir, &db_dir, &mut open) {
                Ok(result) => results.push(result),
                Err(err) => error!(format = %format, error = %err, "bench.load.failed"),
            }
        }
        results
    }

    /// Samples ids from `store` and benchmarks every catalog query.
    pub fn run_query_suite<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<Vec<QueryResult>> {
        let mut rng = params_rng(self.options.seed);
        let ids = SampleIds::load(&mut *store, self.options.sample_size, &mut rng)?;
        let mut results = Vec::with_capacity(catalog().len());
        for spec in catalog() {
            let params = generate_params(spec, &ids, &mut rng);
            if let Some(result) = self.bench_query(&mut *store, spec.name, spec.sql, &params)? {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Writes accumulated results as pretty JSON into `dir`.
    ///
    /// Only non-empty result lists are written. Returns the files written.
    pub fn save_results(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        if !self.load_results.is_empty() {
            let path = dir.join(LOAD_RESULTS_FILE);
            fs::write(&path, serde_json::to_string_pretty(&self.load_results)?)?;
            written.push(path);
        }
        if !self.query_results.is_empty() {
            let path = dir.join(QUERY_RESULTS_FILE);
            fs::write(&path, serde_json::to_string_pretty(&self.query_results)?)?;
            written.push(path);
        }
        for path in &written {
            info!(path = %path.display(), "bench.results.saved");
        }
        Ok(written)
    }
}
