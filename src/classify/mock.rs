//! Scripted classification client for tests and offline demos.

use super::{ClassificationClient, ClassifyError};
use crate::capture::CapturedFrame;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Classification client that replays queued outcomes.
///
/// When the queue is empty it answers with the fallback code.
#[derive(Debug)]
pub struct MockClassificationClient {
    script: Mutex<VecDeque<Result<String, ClassifyError>>>,
    fallback: String,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockClassificationClient {
    /// Creates a client that always answers `fallback` unless scripted.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Makes every request wait for a notification on `gate`.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queues a successful response body.
    pub fn push_code(&self, code: impl Into<String>) {
        self.push(Ok(code.into()));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: ClassifyError) {
        self.push(Err(error));
    }

    /// Number of requests issued (including ones still waiting on the gate).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, outcome: Result<String, ClassifyError>) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(outcome);
    }
}

#[async_trait]
impl ClassificationClient for MockClassificationClient {
    async fn submit(&self, frame: &CapturedFrame) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(bytes = frame.data().len(), "MockClassificationClient received frame");

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
