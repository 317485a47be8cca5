//! Mock capture backend for testing and demos.
//!
//! Every open and stop is counted through a shared [`MockControl`], so tests
//! can assert that each acquisition was released exactly once.

use super::{
    CaptureBackend, DeviceAcquisitionError, DeviceConstraints, DeviceError, RawFrame,
    StreamError, VideoStream, RGB_CHANNELS,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Shared counters and switches for a [`MockDevice`].
#[derive(Debug, Default)]
pub struct MockControl {
    opened: AtomicUsize,
    released: AtomicUsize,
    resets: AtomicUsize,
    unplugged: AtomicBool,
    generation: AtomicU64,
}

impl MockControl {
    /// Streams opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Stream stops so far. Equals `opened()` when nothing leaked.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet stopped.
    pub fn live(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }

    /// Backend resets so far.
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Simulates the device disappearing: open streams go inactive.
    pub fn set_unplugged(&self, unplugged: bool) {
        self.unplugged.store(unplugged, Ordering::SeqCst);
    }

    /// Kills every stream open right now. Later opens are unaffected.
    pub fn disconnect_streams(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock capture backend that generates synthetic RGB frames.
#[derive(Debug, Default)]
pub struct MockDevice {
    control: Arc<MockControl>,
    next_failure: Mutex<Option<DeviceAcquisitionError>>,
    frame_size: Option<(u32, u32)>,
    gate: Option<Arc<Notify>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces frames of a fixed size regardless of the constraints.
    ///
    /// A zero dimension is allowed so tests can exercise empty frames.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Makes every `open` wait for a notification on `gate` before completing.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Returns the shared control block.
    pub fn control(&self) -> Arc<MockControl> {
        Arc::clone(&self.control)
    }

    /// Makes the next `open` fail with the given error.
    pub fn fail_next(&self, error: DeviceAcquisitionError) {
        *self
            .next_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(error);
    }

    fn take_failure(&self) -> Option<DeviceAcquisitionError> {
        self.next_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

#[async_trait]
impl CaptureBackend for MockDevice {
    async fn open(
        &self,
        constraints: &DeviceConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceAcquisitionError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(error) = self.take_failure() {
            tracing::info!(%error, "MockDevice refusing open");
            return Err(error);
        }

        let (width, height) = self
            .frame_size
            .unwrap_or((constraints.width, constraints.height));
        self.control.opened.fetch_add(1, Ordering::SeqCst);
        tracing::info!(width, height, "MockDevice opened");

        Ok(Box::new(MockStream {
            control: Arc::clone(&self.control),
            width,
            height,
            generation: self.control.generation.load(Ordering::SeqCst),
            sequence: 0,
            stopped: false,
        }))
    }

    fn reset(&self) -> Result<(), DeviceError> {
        self.control.resets.fetch_add(1, Ordering::SeqCst);
        self.control.unplugged.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockStream {
    control: Arc<MockControl>,
    width: u32,
    height: u32,
    generation: u64,
    sequence: u64,
    stopped: bool,
}

impl VideoStream for MockStream {
    fn is_active(&self) -> bool {
        !self.stopped
            && !self.control.unplugged.load(Ordering::SeqCst)
            && self.generation == self.control.generation.load(Ordering::SeqCst)
    }

    fn read_frame(&mut self) -> Result<RawFrame, StreamError> {
        if !self.is_active() {
            return Err(StreamError::Inactive);
        }

        // Deterministic gradient mixed with the sequence number
        let width = self.width as usize;
        let pixel_count = width * self.height as usize;
        let mut pixels = Vec::with_capacity(pixel_count * RGB_CHANNELS);
        for i in 0..pixel_count {
            let (x, y) = (i % width.max(1), i / width.max(1));
            pixels.push((x as u64 ^ self.sequence) as u8);
            pixels.push(y as u8);
            pixels.push(((x + y) as u64 + self.sequence) as u8);
        }

        self.sequence += 1;
        Ok(RawFrame::new(pixels, self.width, self.height, self.sequence))
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.control.released.fetch_add(1, Ordering::SeqCst);
        tracing::info!("MockDevice stream stopped");
    }
}
