//! Process memory and on-disk footprint measurements.

use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Tracks resident set size growth from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct MemoryTracker {
    baseline: u64,
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTracker {
    /// Captures the current RSS as the baseline.
    pub fn new() -> Self {
        Self {
            baseline: resident_bytes(),
        }
    }

    /// RSS growth since the baseline, in MiB. Never negative.
    pub fn delta_mb(&self) -> f64 {
        resident_bytes().saturating_sub(self.baseline) as f64 / 1024.0 / 1024.0
    }
}

/// Current resident set size in bytes; 0 where it cannot be read.
#[cfg(target_os = "linux")]
pub fn resident_bytes() -> u64 {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return 0;
    };
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map_or(0, |kb| kb * 1024)
}

/// Current resident set size in bytes; 0 where it cannot be read.
#[cfg(target_os = "macos")]
pub fn resident_bytes() -> u64 {
    std::process::Command::new("ps")
        .args(["-o", "rss=", "-p"])
        .arg(std::process::id().to_string())
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .and_then(|kb| kb.trim().parse::<u64>().ok())
        .map_or(0, |kb| kb * 1024)
}

/// Current resident set size in bytes; 0 where it cannot be read.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn resident_bytes() -> u64 {
    0
}

/// Total size of every regular file below `path`. A missing path is 0 bytes.
pub fn directory_size(path: &Path) -> io::Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let mut total = 0;
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
