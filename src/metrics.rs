//! Lightweight global metrics.
//!
//! Thread-safe atomic counters for:
//! - environment lifecycle (open/close/close errors)
//! - table extraction (tables, entries, failures)
//! - stats monitor (samples taken/failed)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Env lifecycle -----
static ENVS_OPENED: AtomicU64 = AtomicU64::new(0);
static ENVS_CLOSED: AtomicU64 = AtomicU64::new(0);
static ENV_CLOSE_ERRORS: AtomicU64 = AtomicU64::new(0);

// ----- Extraction -----
static TABLES_EXTRACTED: AtomicU64 = AtomicU64::new(0);
static ENTRIES_EXTRACTED: AtomicU64 = AtomicU64::new(0);
static EXTRACT_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Stats monitor -----
static STATS_SAMPLES: AtomicU64 = AtomicU64::new(0);
static STATS_SAMPLE_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Env lifecycle
    pub envs_opened: u64,
    pub envs_closed: u64,
    pub env_close_errors: u64,

    // Extraction
    pub tables_extracted: u64,
    pub entries_extracted: u64,
    pub extract_failures: u64,

    // Stats monitor
    pub stats_samples: u64,
    pub stats_sample_failures: u64,
}

impl MetricsSnapshot {
    /// Environments opened but not closed yet.
    pub fn envs_open(&self) -> u64 {
        self.envs_opened.saturating_sub(self.envs_closed)
    }

    pub fn avg_entries_per_table(&self) -> f64 {
        if self.tables_extracted == 0 {
            0.0
        } else {
            self.entries_extracted as f64 / self.tables_extracted as f64
        }
    }
}

// ----- Recorders (Env lifecycle) -----
pub fn record_env_open() {
    ENVS_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_env_close(ok: bool) {
    ENVS_CLOSED.fetch_add(1, Ordering::Relaxed);
    if !ok {
        ENV_CLOSE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

// ----- Recorders (Extraction) -----
pub fn record_table_extracted(entries: usize) {
    TABLES_EXTRACTED.fetch_add(1, Ordering::Relaxed);
    ENTRIES_EXTRACTED.fetch_add(entries as u64, Ordering::Relaxed);
}

pub fn record_extract_failure() {
    EXTRACT_FAILURES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Stats monitor) -----
pub fn record_stats_sample(ok: bool) {
    if ok {
        STATS_SAMPLES.fetch_add(1, Ordering::Relaxed);
    } else {
        STATS_SAMPLE_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        envs_opened: ENVS_OPENED.load(Ordering::Relaxed),
        envs_closed: ENVS_CLOSED.load(Ordering::Relaxed),
        env_close_errors: ENV_CLOSE_ERRORS.load(Ordering::Relaxed),

        tables_extracted: TABLES_EXTRACTED.load(Ordering::Relaxed),
        entries_extracted: ENTRIES_EXTRACTED.load(Ordering::Relaxed),
        extract_failures: EXTRACT_FAILURES.load(Ordering::Relaxed),

        stats_samples: STATS_SAMPLES.load(Ordering::Relaxed),
        stats_sample_failures: STATS_SAMPLE_FAILURES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    ENVS_OPENED.store(0, Ordering::Relaxed);
    ENVS_CLOSED.store(0, Ordering::Relaxed);
    ENV_CLOSE_ERRORS.store(0, Ordering::Relaxed);

    TABLES_EXTRACTED.store(0, Ordering::Relaxed);
    ENTRIES_EXTRACTED.store(0, Ordering::Relaxed);
    EXTRACT_FAILURES.store(0, Ordering::Relaxed);

    STATS_SAMPLES.store(0, Ordering::Relaxed);
    STATS_SAMPLE_FAILURES.store(0, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_counters() {
        let m = MetricsSnapshot {
            envs_opened: 3,
            envs_closed: 2,
            tables_extracted: 4,
            entries_extracted: 10,
            ..MetricsSnapshot::default()
        };
        assert_eq!(m.envs_open(), 1);
        assert_eq!(m.avg_entries_per_table(), 2.5);
        assert_eq!(MetricsSnapshot::default().avg_entries_per_table(), 0.0);
    }
}
