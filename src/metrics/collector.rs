//! Metrics collection and registry.

use crate::mapper::Category;
use crate::session::{CaptureSession, FailureKind, SessionState, SessionStats};
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

const STATE_NAMES: [&str; 7] = [
    "idle",
    "acquiring",
    "streaming",
    "captured",
    "uploading",
    "resulted",
    "failed",
];

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Name of the current session state.
    pub state: &'static str,
    /// Session counters.
    pub stats: SessionStats,
    /// Device handles currently live.
    pub live_handles: usize,
}

impl MetricsSnapshot {
    /// Captures the current state of a session.
    pub fn from_session(session: &CaptureSession) -> Self {
        Self::from_parts(&session.state(), session.stats(), session.live_handles())
    }

    pub fn from_parts(state: &SessionState, stats: SessionStats, live_handles: usize) -> Self {
        Self {
            state: state.name(),
            stats,
            live_handles,
        }
    }
}

/// Prometheus metrics registry for capture sessions.
pub struct MetricsRegistry {
    registry: Registry,

    state: IntGaugeVec,
    live_handles: IntGauge,

    acquisitions_total: IntCounter,
    releases_total: IntCounter,
    captures_total: IntCounter,
    submissions_total: IntCounter,
    stale_discarded_total: IntCounter,

    results_total: IntCounterVec,
    failures_total: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let state = IntGaugeVec::new(
            Opts::new(
                "capture_session_state",
                "Current session state (1 for the active state)",
            ),
            &["state"],
        )?;
        let live_handles = IntGauge::new(
            "capture_session_live_handles",
            "Device handles acquired and not yet released",
        )?;

        let acquisitions_total = IntCounter::new(
            "capture_session_acquisitions_total",
            "Successful device acquisitions",
        )?;
        let releases_total = IntCounter::new(
            "capture_session_releases_total",
            "Device releases performed by the session",
        )?;
        let captures_total =
            IntCounter::new("capture_session_captures_total", "Frames captured")?;
        let submissions_total = IntCounter::new(
            "capture_session_submissions_total",
            "Classification requests issued",
        )?;
        let stale_discarded_total = IntCounter::new(
            "capture_session_stale_discarded_total",
            "Completions discarded after stop",
        )?;

        let results_total = IntCounterVec::new(
            Opts::new(
                "capture_session_results_total",
                "Classification results by category",
            ),
            &["category"],
        )?;
        let failures_total = IntCounterVec::new(
            Opts::new("capture_session_failures_total", "Session failures by kind"),
            &["kind"],
        )?;

        registry.register(Box::new(state.clone()))?;
        registry.register(Box::new(live_handles.clone()))?;
        registry.register(Box::new(acquisitions_total.clone()))?;
        registry.register(Box::new(releases_total.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(stale_discarded_total.clone()))?;
        registry.register(Box::new(results_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;

        // Pre-create labelled series so they show up before the first event
        for name in STATE_NAMES {
            state.with_label_values(&[name]).set(0);
        }
        for category in Category::ALL {
            results_total.with_label_values(&[category.label()]);
        }
        for kind in FailureKind::ALL {
            failures_total.with_label_values(&[kind.label()]);
        }

        Ok(Self {
            registry,
            state,
            live_handles,
            acquisitions_total,
            releases_total,
            captures_total,
            submissions_total,
            stale_discarded_total,
            results_total,
            failures_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        for name in STATE_NAMES {
            let active = if name == snapshot.state { 1 } else { 0 };
            self.state.with_label_values(&[name]).set(active);
        }
        self.live_handles.set(snapshot.live_handles as i64);

        let stats = &snapshot.stats;
        advance(&self.acquisitions_total, stats.acquisitions);
        advance(&self.releases_total, stats.releases);
        advance(&self.captures_total, stats.captures);
        advance(&self.submissions_total, stats.submissions);
        advance(&self.stale_discarded_total, stats.stale_discarded);

        for category in Category::ALL {
            advance(
                &self.results_total.with_label_values(&[category.label()]),
                stats.results(category),
            );
        }
        for kind in FailureKind::ALL {
            advance(
                &self.failures_total.with_label_values(&[kind.label()]),
                stats.failures(kind),
            );
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Counters only move forward: increment by the difference.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
