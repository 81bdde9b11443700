//! Command-line driver: generate datasets, run benchmarks, compare runs.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use authbench::bench::{BenchmarkRunner, LoadResult, QueryResult};
use authbench::compare::{CrossRunAggregator, CrossRunReport, RunSet};
use authbench::config::BenchConfig;
use authbench::export::{export_graph, DataFormat};
use authbench::generator::generate;
use authbench::logging::init_logging;
use authbench::store::SqliteStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "authbench",
    version,
    about = "Synthetic authorization graph generator and benchmark runner",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, env = "AUTHBENCH_CONFIG", help = "Configuration file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Log filter, e.g. `info` or `authbench=debug`")]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Parquet,
}

impl From<FormatArg> for DataFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => DataFormat::Csv,
            FormatArg::Json => DataFormat::Json,
            FormatArg::Parquet => DataFormat::Parquet,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Generate a graph and export it as dataset files")]
    Generate(GenerateCmd),
    #[command(about = "Bulk-load datasets into fresh stores and time it")]
    Load(LoadCmd),
    #[command(about = "Run the authorization query catalog against a loaded store")]
    Query(QueryCmd),
    #[command(about = "Compare saved results of several runs")]
    Compare(CompareCmd),
}

#[derive(Args, Debug)]
struct GenerateCmd {
    #[arg(long, help = "Number of users")]
    users: Option<usize>,
    #[arg(long, help = "Number of resources")]
    resources: Option<usize>,
    #[arg(long, help = "Number of groups")]
    groups: Option<usize>,
    #[arg(long, help = "RNG seed")]
    seed: Option<u64>,
    #[arg(long, help = "Dataset root directory")]
    out: Option<PathBuf>,
    #[arg(long = "format", value_enum, help = "Formats to write (repeatable)")]
    formats: Vec<FormatArg>,
    #[arg(long, help = "Re-check graph invariants before exporting")]
    verify: bool,
}

#[derive(Args, Debug)]
struct LoadCmd {
    #[arg(long, help = "Dataset root directory")]
    data: Option<PathBuf>,
    #[arg(long, help = "Store root directory")]
    db: Option<PathBuf>,
    #[arg(long, help = "Results directory")]
    results: Option<PathBuf>,
    #[arg(long = "format", value_enum, help = "Formats to load (repeatable)")]
    formats: Vec<FormatArg>,
}

#[derive(Args, Debug)]
struct QueryCmd {
    #[arg(long, help = "Store root directory")]
    db: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = FormatArg::Csv, help = "Which loaded store to query")]
    format: FormatArg,
    #[arg(long, help = "Results directory")]
    results: Option<PathBuf>,
    #[arg(long, help = "Warmup iterations per query")]
    warmup: Option<usize>,
    #[arg(long, help = "Seed for id sampling")]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct CompareCmd {
    #[arg(
        long = "run",
        value_name = "LABEL=DIR",
        required = true,
        value_parser = parse_run,
        help = "A run's label and results directory; the first one is the baseline"
    )]
    runs: Vec<(String, PathBuf)>,
    #[arg(
        long = "footprint",
        value_name = "LABEL=BYTES",
        value_parser = parse_footprint,
        help = "Artifact size of a run"
    )]
    footprints: Vec<(String, u64)>,
    #[arg(long, value_enum, default_value_t = FormatArg::Csv, help = "Format the in-run comparison starts from")]
    baseline_format: FormatArg,
    #[arg(long, value_enum, default_value_t = FormatArg::Json, help = "Format compared against the baseline format")]
    candidate_format: FormatArg,
}

fn parse_run(raw: &str) -> Result<(String, PathBuf), String> {
    let (label, dir) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=DIR, got {raw:?}"))?;
    Ok((label.to_string(), PathBuf::from(dir)))
}

fn parse_footprint(raw: &str) -> Result<(String, u64), String> {
    let (label, bytes) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=BYTES, got {raw:?}"))?;
    let bytes = bytes.parse().map_err(|e| format!("bad byte count {bytes:?}: {e}"))?;
    Ok((label.to_string(), bytes))
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = BenchConfig::load(cli.config.clone())?;
    init_logging(cli.log_level.as_deref().or(config.log_level.as_deref()))?;

    match cli.command {
        Command::Generate(cmd) => {
            apply_generate(&mut config, &cmd);
            let graph = generate(&config.generation)?;
            if cmd.verify {
                graph.verify()?;
            }
            let mut written = Vec::new();
            for &format in &config.formats {
                written.extend(export_graph(&graph, &config.paths.data_dir, format)?);
            }
            let summary = GenerateSummary {
                seed: config.generation.seed,
                nodes: graph.node_count(),
                edges: graph.edge_count(),
                verified: cmd.verify,
                files: written,
            };
            emit(cli.output, &summary, || print_generate_text(&summary))?;
        }
        Command::Load(cmd) => {
            apply_load(&mut config, &cmd);
            let mut runner = BenchmarkRunner::new(config.runner.clone());
            let results = runner.run_load_suite(
                &config.formats,
                &config.paths.data_dir,
                &config.paths.db_dir,
                SqliteStore::open,
            );
            runner.save_results(&config.paths.results_dir)?;
            emit(cli.output, &results, || print_load_text(&results))?;
            if !results.iter().any(LoadResult::is_completed) {
                return Err("every format failed to load".into());
            }
        }
        Command::Query(cmd) => {
            apply_query(&mut config, &cmd);
            let db_dir = config
                .paths
                .db_dir
                .join(DataFormat::from(cmd.format).extension());
            let mut store = SqliteStore::open_existing(&db_dir)?;
            let mut runner = BenchmarkRunner::new(config.runner.clone());
            let results = runner.run_query_suite(&mut store)?;
            runner.save_results(&config.paths.results_dir)?;
            emit(cli.output, &results, || print_query_text(&results))?;
        }
        Command::Compare(cmd) => {
            let mut runs = Vec::with_capacity(cmd.runs.len());
            for (label, dir) in &cmd.runs {
                let mut run = RunSet::from_dir(label.as_str(), dir)?;
                if let Some((_, bytes)) = cmd.footprints.iter().find(|(l, _)| l == label) {
                    run = run.with_footprint(*bytes);
                }
                runs.push(run);
            }
            let report = CrossRunAggregator::new(
                cmd.baseline_format.into(),
                cmd.candidate_format.into(),
            )
            .aggregate(&runs)?;
            emit(cli.output, &report, || print_compare_text(&report))?;
        }
    }
    Ok(())
}

fn apply_generate(config: &mut BenchConfig, cmd: &GenerateCmd) {
    let generation = &mut config.generation;
    if let Some(users) = cmd.users {
        generation.users = users;
    }
    if let Some(resources) = cmd.resources {
        generation.resources = resources;
    }
    if let Some(groups) = cmd.groups {
        generation.groups = groups;
    }
    if let Some(seed) = cmd.seed {
        generation.seed = seed;
    }
    if let Some(out) = &cmd.out {
        config.paths.data_dir = out.clone();
    }
    if !cmd.formats.is_empty() {
        config.formats = cmd.formats.iter().copied().map(DataFormat::from).collect();
    }
}

fn apply_load(config: &mut BenchConfig, cmd: &LoadCmd) {
    if let Some(data) = &cmd.data {
        config.paths.data_dir = data.clone();
    }
    if let Some(db) = &cmd.db {
        config.paths.db_dir = db.clone();
    }
    if let Some(results) = &cmd.results {
        config.paths.results_dir = results.clone();
    }
    if !cmd.formats.is_empty() {
        config.formats = cmd.formats.iter().copied().map(DataFormat::from).collect();
    }
}

fn apply_query(config: &mut BenchConfig, cmd: &QueryCmd) {
    if let Some(db) = &cmd.db {
        config.paths.db_dir = db.clone();
    }
    if let Some(results) = &cmd.results {
        config.paths.results_dir = results.clone();
    }
    if let Some(warmup) = cmd.warmup {
        config.runner.warmup = warmup;
    }
    if let Some(seed) = cmd.seed {
        config.runner.seed = seed;
    }
}

#[derive(Serialize)]
struct GenerateSummary {
    seed: u64,
    nodes: usize,
    edges: usize,
    verified: bool,
    files: Vec<PathBuf>,
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_generate_text(summary: &GenerateSummary) {
    println!(
        "Generated {} nodes and {} edges (seed {}){}",
        summary.nodes,
        summary.edges,
        summary.seed,
        if summary.verified { ", verified" } else { "" }
    );
    for file in &summary.files {
        println!("  {}", file.display());
    }
}

fn print_load_text(results: &[LoadResult]) {
    println!(
        "{:<8} {:>10} {:>12} {:>12} {:>12} {:>14}",
        "Format", "Schema(s)", "Load(s)", "Size(KiB)", "Memory(MB)", "Records/s"
    );
    println!("{}", "-".repeat(73));
    for r in results {
        if !r.is_completed() {
            println!("{:<8} {:>10}", r.format.to_string(), r.state);
            continue;
        }
        println!(
            "{:<8} {:>10.3} {:>12.3} {:>12.1} {:>12.2} {:>14.0}",
            r.format.to_string(),
            r.schema_time,
            r.total_time,
            r.db_size_bytes as f64 / 1024.0,
            r.memory_delta_mb,
            r.throughput
        );
        if !r.skipped_tables.is_empty() {
            println!("         skipped: {}", r.skipped_tables.join(", "));
        }
    }
}

fn print_query_text(results: &[QueryResult]) {
    println!(
        "{:<45} {:>10} {:>10} {:>10} {:>8}",
        "Query", "Avg (ms)", "p95 (ms)", "p99 (ms)", "Rows"
    );
    println!("{}", "-".repeat(87));
    for r in results {
        let name: String = r.name.chars().take(44).collect();
        println!(
            "{:<45} {:>10.3} {:>10.3} {:>10.3} {:>8}",
            name, r.average, r.p95, r.p99, r.result_row_count
        );
    }
}

fn print_compare_text(report: &CrossRunReport) {
    let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
    println!("Baseline: {}", report.baseline);
    println!(
        "{:<20} {:>14} {:>14} {:>14}",
        "Run", "Avg query ms", "Avg p95 ms", "Best load s"
    );
    for run in &report.runs {
        println!(
            "{:<20} {:>14} {:>14} {:>14}",
            run.label,
            opt(run.avg_query_ms),
            opt(run.avg_p95_ms),
            opt(run.best_load_time)
        );
    }
    for f in &report.formats {
        println!(
            "{}: {} vs {} load {}%, memory {}%",
            f.run,
            f.candidate,
            f.baseline,
            opt(f.load_speedup_pct),
            opt(f.memory_reduction_pct)
        );
    }
    for l in &report.loads {
        println!(
            "{} vs {} ({}): {}% faster, x{}, memory {}%",
            l.run,
            l.baseline_run,
            l.format,
            opt(l.improvement_pct),
            opt(l.slowdown),
            opt(l.memory_reduction_pct)
        );
    }
    for q in &report.queries {
        println!(
            "{:<45} winner: {}",
            q.name,
            q.winner.as_deref().unwrap_or("-")
        );
    }
    let w = &report.winners;
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!(
        "Winners: query={} load={} memory={} footprint={}",
        show(&w.query_speed),
        show(&w.load_speed),
        show(&w.memory),
        show(&w.footprint)
    );
}
