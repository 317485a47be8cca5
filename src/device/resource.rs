//! Device resource: acquisition, release and reset of capture streams.

use super::{
    CaptureBackend, DeviceAcquisitionError, DeviceConstraints, DeviceError, RawFrame, StreamError,
    VideoStream,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identifier of an acquired device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev-{}", self.0)
    }
}

/// A live capture stream acquired through [`DeviceResource::acquire`].
///
/// Released exactly once: either explicitly or when dropped.
pub struct DeviceHandle {
    id: HandleId,
    stream: Option<Box<dyn VideoStream>>,
    live: Arc<AtomicUsize>,
}

impl DeviceHandle {
    /// Returns the handle identifier.
    #[inline]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Returns true if the handle has been released.
    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }

    /// Returns true if the underlying stream is delivering frames.
    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    /// Reads the current frame from the stream.
    pub fn read_frame(&mut self) -> Result<RawFrame, StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::Released)?;
        if !stream.is_active() {
            return Err(StreamError::Inactive);
        }
        stream.read_frame()
    }

    /// Stops the stream. Returns false if it was already released.
    fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                self.live.fetch_sub(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if self.release() {
            tracing::debug!(handle = %self.id, "Device handle released on drop");
        }
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Owns a capture backend and hands out device handles.
pub struct DeviceResource {
    backend: Arc<dyn CaptureBackend>,
    next_id: AtomicU64,
    live: Arc<AtomicUsize>,
}

impl DeviceResource {
    /// Creates a resource over the given backend.
    pub fn new(backend: impl CaptureBackend + 'static) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    /// Creates a resource over a shared backend.
    pub fn from_shared(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            next_id: AtomicU64::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquires a stream matching the constraints.
    pub async fn acquire(
        &self,
        constraints: &DeviceConstraints,
    ) -> Result<DeviceHandle, DeviceAcquisitionError> {
        constraints
            .validate()
            .map_err(|e| DeviceAcquisitionError::Unsupported(e.to_string()))?;

        let stream = self.backend.open(constraints).await?;
        let id = HandleId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            handle = %id,
            backend = self.backend.name(),
            width = constraints.width,
            height = constraints.height,
            "Capture device acquired"
        );

        Ok(DeviceHandle {
            id,
            stream: Some(stream),
            live: Arc::clone(&self.live),
        })
    }

    /// Releases a handle. Safe to call any number of times.
    ///
    /// Returns true if this call performed the release.
    pub fn release(&self, handle: &mut DeviceHandle) -> bool {
        let released = handle.release();
        if released {
            tracing::info!(handle = %handle.id, "Capture device released");
        }
        released
    }

    /// Forces the backend to a clean state.
    ///
    /// Handles still held elsewhere keep running; the backend decides whether
    /// that blocks the reset.
    pub fn reset(&self) -> Result<(), DeviceError> {
        let live = self.live_handles();
        if live > 0 {
            tracing::warn!(live, "Resetting capture backend with live handles");
        }
        self.backend.reset()?;
        tracing::info!(backend = self.backend.name(), "Capture backend reset");
        Ok(())
    }

    /// Number of handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for DeviceResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceResource")
            .field("backend", &self.backend.name())
            .field("live_handles", &self.live_handles())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockDevice;

    #[tokio::test]
    async fn test_acquire_release_lifecycle() {
        let mock = MockDevice::new();
        let control = mock.control();
        let resource = DeviceResource::new(mock);

        let mut handle = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        assert!(handle.is_streaming());
        assert_eq!(resource.live_handles(), 1);
        assert_eq!(control.live(), 1);

        assert!(resource.release(&mut handle));
        assert!(handle.is_released());
        assert_eq!(resource.live_handles(), 0);
        assert_eq!(control.released(), 1);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let mock = MockDevice::new();
        let control = mock.control();
        let resource = DeviceResource::new(mock);

        let mut handle = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        assert!(resource.release(&mut handle));
        assert!(!resource.release(&mut handle));
        drop(handle);

        assert_eq!(control.opened(), 1);
        assert_eq!(control.released(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_handle() {
        let mock = MockDevice::new();
        let control = mock.control();
        let resource = DeviceResource::new(mock);

        let handle = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        drop(handle);

        assert_eq!(control.released(), 1);
        assert_eq!(resource.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_handle_ids_increase() {
        let resource = DeviceResource::new(MockDevice::new());
        let first = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        let second = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn test_invalid_constraints_rejected_before_open() {
        let mock = MockDevice::new();
        let control = mock.control();
        let resource = DeviceResource::new(mock);

        let result = resource
            .acquire(&DeviceConstraints::with_dimensions(0, 0))
            .await;
        assert!(matches!(result, Err(DeviceAcquisitionError::Unsupported(_))));
        assert_eq!(control.opened(), 0);
    }

    #[tokio::test]
    async fn test_read_after_release_fails() {
        let resource = DeviceResource::new(MockDevice::new());
        let mut handle = resource
            .acquire(&DeviceConstraints::default())
            .await
            .unwrap();
        resource.release(&mut handle);
        assert_eq!(handle.read_frame().unwrap_err(), StreamError::Released);
    }

    #[test]
    fn test_reset_reaches_backend() {
        let mock = MockDevice::new();
        let control = mock.control();
        let resource = DeviceResource::new(mock);

        resource.reset().unwrap();
        assert_eq!(control.resets(), 1);
    }
}
