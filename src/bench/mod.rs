#![forbid(unsafe_code)]

//! Load and query benchmarks against a [`GraphStore`](crate::store::GraphStore).

pub mod memory;
pub mod queries;
pub mod runner;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

pub use memory::{directory_size, MemoryTracker};
pub use queries::{catalog, generate_params, QuerySpec, SampleIds};
pub use runner::{
    BenchmarkRunner, LoadResult, QueryResult, RunnerOptions, LOAD_RESULTS_FILE,
    QUERY_RESULTS_FILE,
};

/// Lifecycle of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    Idle,
    /// Executing discarded warmup iterations.
    WarmingUp,
    /// Executing timed iterations.
    Measuring,
    /// Finished with a result.
    Completed,
    /// Nothing to run; no result is recorded.
    Skipped,
}

impl RunState {
    /// Returns the next state or an [`BenchError::InvalidTransition`].
    ///
    /// Allowed: idle → warming-up → measuring → completed, and idle → skipped.
    pub fn transition(self, to: RunState) -> Result<RunState> {
        use RunState::*;
        match (self, to) {
            (Idle, WarmingUp) | (WarmingUp, Measuring) | (Measuring, Completed) | (Idle, Skipped) => {
                Ok(to)
            }
            (from, to) => Err(BenchError::InvalidTransition { from, to }),
        }
    }

    /// True for completed and skipped runs.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Skipped)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Idle => "idle",
            RunState::WarmingUp => "warming-up",
            RunState::Measuring => "measuring",
            RunState::Completed => "completed",
            RunState::Skipped => "skipped",
        })
    }
}
