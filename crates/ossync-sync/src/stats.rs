//! Transfer accounting and human-readable formatting.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

const KB: f64 = (1u64 << 10) as f64;
const MB: f64 = (1u64 << 20) as f64;
const GB: f64 = (1u64 << 30) as f64;
const TB: f64 = (1u64 << 40) as f64;

/// Three decimals with trailing zeros (and a bare point) removed.
fn trim_float(value: f64) -> String {
    let s = format!("{value:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Binary-unit size, e.g. `1.875 KB`; below 1 KB the exact count in bytes.
pub fn human_bytes(n: i64) -> String {
    let f = n as f64;
    let abs = f.abs();
    if abs >= TB {
        format!("{} TB", trim_float(f / TB))
    } else if abs >= GB {
        format!("{} GB", trim_float(f / GB))
    } else if abs >= MB {
        format!("{} MB", trim_float(f / MB))
    } else if abs >= KB {
        format!("{} KB", trim_float(f / KB))
    } else {
        format!("{f:.0} bytes")
    }
}

/// Compact duration such as `1h2m3s`, `1.5s` or `250ms`.
pub fn human_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", trim_float(nanos as f64 / 1e3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", trim_float(nanos as f64 / 1e6));
    }

    let total = d.as_secs();
    let (hours, minutes) = (total / 3600, total % 3600 / 60);
    let seconds = (total % 60) as f64 + f64::from(d.subsec_nanos()) / 1e9;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{}s", trim_float(seconds)));
    out
}

/// Final tally of an upload or download run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files: usize,
    pub skipped: usize,
    pub failures: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl TransferStats {
    /// `transferred: 1.5 KB (1536 bytes)  time used: 2s  avg. speed: 768 bytes/s`
    pub fn summary(&self) -> String {
        let secs = self.elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            self.bytes as f64
        };
        format!(
            "transferred: {} ({} bytes)  time used: {}  avg. speed: {}/s",
            human_bytes(self.bytes as i64),
            self.bytes,
            human_duration(self.elapsed),
            human_bytes(speed as i64)
        )
    }

    /// `1` when any job failed, else `0`.
    pub fn exit_code(&self) -> i32 {
        if self.failures > 0 {
            1
        } else {
            0
        }
    }
}

/// Counters shared by transfer workers.
#[derive(Debug, Default)]
pub(crate) struct TransferCounters {
    files: AtomicUsize,
    skipped: AtomicUsize,
    failures: AtomicUsize,
    bytes: AtomicU64,
}

impl TransferCounters {
    pub(crate) fn transferred(&self, bytes: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, elapsed: Duration) -> TransferStats {
        TransferStats {
            files: self.files.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            elapsed,
        }
    }
}
