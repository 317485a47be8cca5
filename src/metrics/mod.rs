//! Prometheus metrics for capture sessions.
//!
//! # Metrics Exposed
//!
//! - `capture_session_state{state}` - 1 for the current state, 0 otherwise
//! - `capture_session_live_handles` - device handles not yet released
//! - `capture_session_acquisitions_total` - successful device acquisitions
//! - `capture_session_releases_total` - device releases
//! - `capture_session_captures_total` - frames captured
//! - `capture_session_submissions_total` - classification requests issued
//! - `capture_session_stale_discarded_total` - completions discarded after stop
//! - `capture_session_results_total{category}` - results by category
//! - `capture_session_failures_total{kind}` - failures by kind
//!
//! The HTTP exporter is only built with the `metrics` feature.
//!
//! # Example
//!
//! ```no_run
//! use capture_classify::metrics::{MetricsRegistry, MetricsSnapshot};
//! use capture_classify::session::{SessionState, SessionStats};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let snapshot = MetricsSnapshot::from_parts(&SessionState::Idle, SessionStats::default(), 0);
//! registry.update(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
