//! Tracing subscriber setup for the binaries.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{BenchError, Result};

/// Installs a global `fmt` subscriber filtered by `level`.
///
/// `level` accepts any [`EnvFilter`] directive (`info`, `authbench=debug`, ...).
/// When `level` is `None`, `RUST_LOG` is consulted and `info` is used as the
/// fallback.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| BenchError::invalid(format!("invalid log level: {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| BenchError::invalid("logging already initialized"))
}
