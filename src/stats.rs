//! Run statistics for the capture agent.
//!
//! Counters are atomics so the CLI can read them from outside the engine
//! thread while the engine keeps updating them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current run.
#[derive(Debug)]
pub struct CaptureStats {
    /// Cycles that left idle on a trigger
    cycles_started: AtomicU64,
    /// Cycles aborted because a sensor was missing
    cycles_aborted: AtomicU64,
    /// Sessions sealed at finalize
    sessions_completed: AtomicU64,
    /// Rows across all sealed sessions
    rows_captured: AtomicU64,
    /// Sessions sealed with no rows (not uploaded)
    empty_sessions: AtomicU64,
    /// Sessions that ended with the wrist held still
    still_endings: AtomicU64,
    /// Uploads handed to the transport
    uploads_dispatched: AtomicU64,
    /// Uploads answered with a success status
    uploads_succeeded: AtomicU64,
    /// Uploads answered with a non-success status
    uploads_rejected: AtomicU64,
    /// Uploads that got no response
    uploads_failed: AtomicU64,
    /// Readings discarded because no capture was running
    samples_dropped: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            cycles_aborted: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            rows_captured: AtomicU64::new(0),
            empty_sessions: AtomicU64::new(0),
            still_endings: AtomicU64::new(0),
            uploads_dispatched: AtomicU64::new(0),
            uploads_succeeded: AtomicU64::new(0),
            uploads_rejected: AtomicU64::new(0),
            uploads_failed: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
            run_start: Utc::now(),
        }
    }

    pub fn record_cycle_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_aborted(&self) {
        self.cycles_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sealed session and its row count.
    pub fn record_session(&self, rows: u64) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        self.rows_captured.fetch_add(rows, Ordering::Relaxed);
        if rows == 0 {
            self.empty_sessions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_still_ending(&self) {
        self.still_endings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_dispatched(&self) {
        self.uploads_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_succeeded(&self) {
        self.uploads_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_rejected(&self) {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Uploads dispatched whose outcome has not arrived yet.
    pub fn uploads_pending(&self) -> u64 {
        let finished = self.uploads_succeeded.load(Ordering::Relaxed)
            + self.uploads_rejected.load(Ordering::Relaxed)
            + self.uploads_failed.load(Ordering::Relaxed);
        self.uploads_dispatched
            .load(Ordering::Relaxed)
            .saturating_sub(finished)
    }

    /// Get the current statistics.
    pub fn stats(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_aborted: self.cycles_aborted.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            rows_captured: self.rows_captured.load(Ordering::Relaxed),
            empty_sessions: self.empty_sessions.load(Ordering::Relaxed),
            still_endings: self.still_endings.load(Ordering::Relaxed),
            uploads_dispatched: self.uploads_dispatched.load(Ordering::Relaxed),
            uploads_succeeded: self.uploads_succeeded.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Cycles started: {}\n\
             - Cycles aborted: {}\n\
             - Sessions captured: {} ({} empty, {} ended still)\n\
             - Rows captured: {}\n\
             - Uploads: {} dispatched, {} ok, {} rejected, {} failed\n\
             - Late readings dropped: {}\n\
             - Run duration: {} seconds",
            stats.cycles_started,
            stats.cycles_aborted,
            stats.sessions_completed,
            stats.empty_sessions,
            stats.still_endings,
            stats.rows_captured,
            stats.uploads_dispatched,
            stats.uploads_succeeded,
            stats.uploads_rejected,
            stats.uploads_failed,
            stats.samples_dropped,
            stats.run_duration_secs
        )
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatsSnapshot {
    pub cycles_started: u64,
    pub cycles_aborted: u64,
    pub sessions_completed: u64,
    pub rows_captured: u64,
    pub empty_sessions: u64,
    pub still_endings: u64,
    pub uploads_dispatched: u64,
    pub uploads_succeeded: u64,
    pub uploads_rejected: u64,
    pub uploads_failed: u64,
    pub samples_dropped: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedCaptureStats = Arc<CaptureStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedCaptureStats {
    Arc::new(CaptureStats::new())
}
