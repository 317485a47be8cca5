//! Backend abstraction over capture hardware.
//!
//! A backend opens streams; a stream yields raw frames until stopped.
//! Release bookkeeping lives in [`DeviceResource`](super::DeviceResource),
//! not here.

use super::{DeviceConstraints, RawFrame};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while acquiring a capture device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceAcquisitionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("no matching capture device: {0}")]
    NotFound(String),
    #[error("capture device busy: {0}")]
    Busy(String),
    #[error("unsupported constraints: {0}")]
    Unsupported(String),
    #[error("failed to open capture device: {0}")]
    OpenFailed(String),
}

/// Errors raised by an open stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("stream is not active")]
    Inactive,
    #[error("stream already released")]
    Released,
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

/// Errors raised by device-level maintenance operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device still in use by {0} stream(s)")]
    InUse(usize),
    #[error("device reset failed: {0}")]
    ResetFailed(String),
}

/// Trait for capture hardware backends.
///
/// `open` is the only suspending call: it may wait on a permission prompt or
/// on the hardware itself.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Opens a stream matching the constraints as closely as possible.
    async fn open(
        &self,
        constraints: &DeviceConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceAcquisitionError>;

    /// Forces the capture pipeline back to a clean state.
    fn reset(&self) -> Result<(), DeviceError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// An open capture stream.
pub trait VideoStream: Send {
    /// Returns true while the stream delivers frames.
    fn is_active(&self) -> bool;

    /// Reads the current frame. Never blocks on the network or a prompt.
    fn read_frame(&mut self) -> Result<RawFrame, StreamError>;

    /// Stops the stream and releases the underlying device.
    fn stop(&mut self);
}
