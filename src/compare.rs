#![forbid(unsafe_code)]

//! Cross-run comparison of persisted benchmark results.
//!
//! Runs are loose collections: any of their result files may be absent. Every
//! derived number is an `Option`, and comparisons whose inputs are missing
//! are left out of the report instead of failing it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bench::{LoadResult, QueryResult, LOAD_RESULTS_FILE, QUERY_RESULTS_FILE};
use crate::error::{BenchError, Result};
use crate::export::DataFormat;
use crate::stats::mean;

/// `(baseline - candidate) / baseline * 100`.
///
/// Positive means the candidate is smaller (faster, leaner). `None` when the
/// baseline is zero or either value is not finite.
pub fn percentage_improvement(baseline: f64, candidate: f64) -> Option<f64> {
    if !baseline.is_finite() || !candidate.is_finite() || baseline == 0.0 {
        return None;
    }
    Some((baseline - candidate) / baseline * 100.0)
}

/// `candidate / baseline`; `None` under the same conditions as
/// [`percentage_improvement`].
pub fn slowdown_ratio(baseline: f64, candidate: f64) -> Option<f64> {
    if !baseline.is_finite() || !candidate.is_finite() || baseline == 0.0 {
        return None;
    }
    Some(candidate / baseline)
}

/// Label with the smallest present, finite value. Ties keep the first label.
pub fn winner<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    candidates
        .into_iter()
        .filter_map(|(label, value)| value.filter(|v| v.is_finite()).map(|v| (label, v)))
        .fold(None::<(&'a str, f64)>, |best, (label, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((label, v)),
        })
        .map(|(label, _)| label)
}

/// Results of one benchmark run, e.g. one machine or one store build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSet {
    /// Display label.
    pub label: String,
    /// Load results, when the run produced them.
    pub loading: Option<Vec<LoadResult>>,
    /// Query results, when the run produced them.
    pub queries: Option<Vec<QueryResult>>,
    /// Size of the shipped store artifact, when known.
    pub footprint_bytes: Option<u64>,
}

impl RunSet {
    /// Run with no results yet.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Reads the result files saved by the runner in `dir`.
    ///
    /// Absent files leave the matching field `None`; a missing directory is
    /// an error.
    pub fn from_dir(label: impl Into<String>, dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(BenchError::missing_input(dir));
        }
        let run = Self {
            label: label.into(),
            loading: read_optional(&dir.join(LOAD_RESULTS_FILE))?,
            queries: read_optional(&dir.join(QUERY_RESULTS_FILE))?,
            footprint_bytes: None,
        };
        debug!(
            label = %run.label,
            loading = run.loading.is_some(),
            queries = run.queries.is_some(),
            "compare.run.loaded"
        );
        Ok(run)
    }

    /// Attaches a footprint size.
    pub fn with_footprint(mut self, bytes: u64) -> Self {
        self.footprint_bytes = Some(bytes);
        self
    }

    /// Loads that actually ran; skipped formats carry no timings.
    fn completed_loads(&self) -> impl Iterator<Item = &LoadResult> {
        self.loading
            .iter()
            .flatten()
            .filter(|r| r.is_completed())
    }

    fn load_for(&self, format: DataFormat) -> Option<&LoadResult> {
        self.completed_loads().find(|r| r.format == format)
    }

    fn query(&self, name: &str) -> Option<&QueryResult> {
        self.queries.as_ref()?.iter().find(|q| q.name == name)
    }

    fn summary(&self) -> RunSummary {
        let queries = self.queries.as_deref().unwrap_or_default();
        let best_load = self
            .completed_loads()
            .min_by(|a, b| a.total_time.total_cmp(&b.total_time));
        RunSummary {
            label: self.label.clone(),
            avg_query_ms: mean(queries.iter().map(|q| q.average)),
            avg_p95_ms: mean(queries.iter().map(|q| q.p95)),
            best_load_time: best_load.map(|r| r.total_time),
            best_load_format: best_load.map(|r| r.format),
            min_memory_mb: self
                .completed_loads()
                .map(|r| r.memory_delta_mb)
                .min_by(f64::total_cmp),
            footprint_bytes: self.footprint_bytes,
        }
    }
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Headline numbers of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run label.
    pub label: String,
    /// Mean of the per-query averages, ms.
    pub avg_query_ms: Option<f64>,
    /// Mean of the per-query p95 values, ms.
    pub avg_p95_ms: Option<f64>,
    /// Fastest load over all formats, seconds.
    pub best_load_time: Option<f64>,
    /// Format of the fastest load.
    pub best_load_format: Option<DataFormat>,
    /// Smallest memory growth over all loads, MiB.
    pub min_memory_mb: Option<f64>,
    /// Store artifact size.
    pub footprint_bytes: Option<u64>,
}

/// Candidate format vs baseline format within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatComparison {
    /// Run label.
    pub run: String,
    /// Baseline format.
    pub baseline: DataFormat,
    /// Candidate format.
    pub candidate: DataFormat,
    /// Load-time improvement of the candidate, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_speedup_pct: Option<f64>,
    /// Memory-growth reduction of the candidate, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reduction_pct: Option<f64>,
}

/// One format's load of a run vs the same format in the baseline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadComparison {
    /// Compared run.
    pub run: String,
    /// Baseline run.
    pub baseline_run: String,
    /// Format loaded in both.
    pub format: DataFormat,
    /// Baseline load time, seconds.
    pub baseline_time: f64,
    /// Compared load time, seconds.
    pub time: f64,
    /// Improvement over the baseline, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_pct: Option<f64>,
    /// `time / baseline_time`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowdown: Option<f64>,
    /// Baseline memory growth, MiB.
    pub baseline_memory_mb: f64,
    /// Compared memory growth, MiB.
    pub memory_mb: f64,
    /// Memory-growth reduction over the baseline, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reduction_pct: Option<f64>,
}

/// One query across every run that measured it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryComparison {
    /// Query name.
    pub name: String,
    /// Average latency per run label, ms.
    pub average_ms: BTreeMap<String, f64>,
    /// p95 latency per run label, ms.
    pub p95_ms: BTreeMap<String, f64>,
    /// Improvement of each non-baseline run over the baseline, percent.
    pub improvement_pct: BTreeMap<String, f64>,
    /// Run with the lowest average.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

/// Overall winners, by smallest value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Winners {
    /// Lowest mean query latency.
    pub query_speed: Option<String>,
    /// Fastest load.
    pub load_speed: Option<String>,
    /// Smallest memory growth during load.
    pub memory: Option<String>,
    /// Smallest artifact.
    pub footprint: Option<String>,
}

/// Everything derivable from a set of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRunReport {
    /// Label of the run others are compared to.
    pub baseline: String,
    /// Per-run headline numbers, in input order.
    pub runs: Vec<RunSummary>,
    /// Within-run format comparisons.
    pub formats: Vec<FormatComparison>,
    /// Cross-run load comparisons.
    pub loads: Vec<LoadComparison>,
    /// Cross-run query comparisons, in first-seen query order.
    pub queries: Vec<QueryComparison>,
    /// Overall winners.
    pub winners: Winners,
}

/// Builds a [`CrossRunReport`] from [`RunSet`]s.
#[derive(Debug, Clone)]
pub struct CrossRunAggregator {
    baseline_format: DataFormat,
    candidate_format: DataFormat,
}

impl Default for CrossRunAggregator {
    fn default() -> Self {
        Self::new(DataFormat::Csv, DataFormat::Json)
    }
}

impl CrossRunAggregator {
    /// Aggregator comparing `candidate_format` against `baseline_format`
    /// inside each run.
    pub fn new(baseline_format: DataFormat, candidate_format: DataFormat) -> Self {
        Self {
            baseline_format,
            candidate_format,
        }
    }

    /// Compares every run against the first one.
    pub fn aggregate(&self, runs: &[RunSet]) -> Result<CrossRunReport> {
        let (baseline, others) = runs
            .split_first()
            .ok_or_else(|| BenchError::invalid("at least one run is required"))?;

        let summaries: Vec<RunSummary> = runs.iter().map(RunSet::summary).collect();

        let formats = runs
            .iter()
            .filter_map(|run| self.format_comparison(run))
            .collect();

        let mut loads = Vec::new();
        for run in others {
            for format in DataFormat::ALL {
                let (Some(base), Some(cand)) = (baseline.load_for(format), run.load_for(format))
                else {
                    continue;
                };
                loads.push(LoadComparison {
                    run: run.label.clone(),
                    baseline_run: baseline.label.clone(),
                    format,
                    baseline_time: base.total_time,
                    time: cand.total_time,
                    improvement_pct: percentage_improvement(base.total_time, cand.total_time),
                    slowdown: slowdown_ratio(base.total_time, cand.total_time),
                    baseline_memory_mb: base.memory_delta_mb,
                    memory_mb: cand.memory_delta_mb,
                    memory_reduction_pct: percentage_improvement(
                        base.memory_delta_mb,
                        cand.memory_delta_mb,
                    ),
                });
            }
        }

        let queries = query_comparisons(baseline, runs);

        let winners = Winners {
            query_speed: owned(winner(
                summaries.iter().map(|s| (s.label.as_str(), s.avg_query_ms)),
            )),
            load_speed: owned(winner(
                summaries.iter().map(|s| (s.label.as_str(), s.best_load_time)),
            )),
            memory: owned(winner(
                summaries.iter().map(|s| (s.label.as_str(), s.min_memory_mb)),
            )),
            footprint: owned(winner(
                summaries
                    .iter()
                    .map(|s| (s.label.as_str(), s.footprint_bytes.map(|b| b as f64))),
            )),
        };

        Ok(CrossRunReport {
            baseline: baseline.label.clone(),
            runs: summaries,
            formats,
            loads,
            queries,
            winners,
        })
    }

    fn format_comparison(&self, run: &RunSet) -> Option<FormatComparison> {
        let base = run.load_for(self.baseline_format)?;
        let cand = run.load_for(self.candidate_format)?;
        Some(FormatComparison {
            run: run.label.clone(),
            baseline: self.baseline_format,
            candidate: self.candidate_format,
            load_speedup_pct: percentage_improvement(base.total_time, cand.total_time),
            memory_reduction_pct: percentage_improvement(base.memory_delta_mb, cand.memory_delta_mb),
        })
    }
}

fn owned(label: Option<&str>) -> Option<String> {
    label.map(str::to_string)
}

fn query_comparisons(baseline: &RunSet, runs: &[RunSet]) -> Vec<QueryComparison> {
    let mut names: Vec<&str> = Vec::new();
    for run in runs {
        for q in run.queries.as_deref().unwrap_or_default() {
            if !names.contains(&q.name.as_str()) {
                names.push(&q.name);
            }
        }
    }

    let mut out = Vec::new();
    for name in names {
        let measured: Vec<(&str, &QueryResult)> = runs
            .iter()
            .filter_map(|run| run.query(name).map(|q| (run.label.as_str(), q)))
            .collect();
        if measured.len() < 2 {
            continue;
        }
        let base = baseline.query(name);
        let improvement_pct = measured
            .iter()
            .filter(|(label, _)| *label != baseline.label)
            .filter_map(|(label, q)| {
                let pct = percentage_improvement(base?.average, q.average)?;
                Some((label.to_string(), pct))
            })
            .collect();
        out.push(QueryComparison {
            name: name.to_string(),
            average_ms: measured
                .iter()
                .map(|(label, q)| (label.to_string(), q.average))
                .collect(),
            p95_ms: measured
                .iter()
                .map(|(label, q)| (label.to_string(), q.p95))
                .collect(),
            improvement_pct,
            winner: owned(winner(measured.iter().map(|(label, q)| (*label, Some(q.average))))),
        });
    }
    out
}
