//! The capture-classify state machine.

use super::{Failure, FailureKind, SessionError, SessionState, SessionStats};
use crate::capture::{CaptureError, CapturedFrame, FrameCapturer};
use crate::classify::{ClassificationClient, ClassifyError};
use crate::device::{DeviceConstraints, DeviceHandle, DeviceResource, HandleId};
use crate::mapper::{self, ClassificationResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct Inner {
    state: SessionState,
    /// Bumped by every operation start and by `stop()`. A suspended operation
    /// whose epoch no longer matches is stale.
    epoch: u64,
    handle: Option<DeviceHandle>,
    frame: Option<Arc<CapturedFrame>>,
    upload: Option<CancellationToken>,
    stats: SessionStats,
}

/// Orchestrates device acquisition, frame capture, upload and result mapping.
///
/// All methods take `&self`; share the session through an `Arc` when
/// `stop()` must be callable while `start()` or `submit()` is suspended.
/// The internal lock is never held across an await.
///
/// Dropping the session releases any device handle it holds.
pub struct CaptureSession {
    device: DeviceResource,
    capturer: FrameCapturer,
    client: Arc<dyn ClassificationClient>,
    constraints: DeviceConstraints,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
}

impl CaptureSession {
    /// Creates an idle session.
    pub fn new(
        device: DeviceResource,
        client: Arc<dyn ClassificationClient>,
        constraints: DeviceConstraints,
        capturer: FrameCapturer,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            device,
            capturer,
            client,
            constraints,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                epoch: 0,
                handle: None,
                frame: None,
                upload: None,
                stats: SessionStats::default(),
            }),
            state_tx,
        }
    }

    /// Acquires the device and starts streaming.
    ///
    /// While a stream is already open this returns the existing handle id
    /// without touching the device.
    pub async fn start(&self) -> Result<HandleId, SessionError> {
        let epoch = {
            let mut inner = self.lock();
            match &inner.state {
                state if state.is_busy() => {
                    return Err(SessionError::OperationInProgress(state.name()));
                }
                state if state.is_streaming() => {
                    // A handle whose stream died is replaced below
                    if let Some(handle) = inner.handle.as_ref().filter(|h| h.is_streaming()) {
                        tracing::debug!(handle = %handle.id(), "start() while streaming");
                        return Ok(handle.id());
                    }
                    tracing::warn!("Stream no longer active, reacquiring device");
                }
                _ => {}
            }

            self.release_held(&mut inner);
            inner.epoch += 1;
            self.transition(&mut inner, SessionState::Acquiring);
            inner.epoch
        };

        let acquired = self.device.acquire(&self.constraints).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            inner.stats.stale_discarded += 1;
            if let Ok(mut handle) = acquired {
                inner.stats.acquisitions += 1;
                tracing::warn!(handle = %handle.id(), "Releasing device acquired after stop");
                if self.device.release(&mut handle) {
                    inner.stats.releases += 1;
                }
            }
            return Err(SessionError::Cancelled);
        }

        match acquired {
            Ok(handle) => {
                let id = handle.id();
                inner.stats.acquisitions += 1;
                inner.handle = Some(handle);
                self.transition(&mut inner, SessionState::Streaming);
                Ok(id)
            }
            Err(error) => {
                tracing::warn!(%error, "Device acquisition failed");
                self.fail(&mut inner, FailureKind::DeviceAcquisition, &error);
                Err(error.into())
            }
        }
    }

    /// Captures a still frame from the open stream.
    ///
    /// The new frame supersedes any earlier one. On error the state is left
    /// unchanged.
    pub fn capture(&self) -> Result<Arc<CapturedFrame>, SessionError> {
        let mut inner = self.lock();
        if !inner.state.is_streaming() {
            tracing::debug!(state = %inner.state, "capture() outside streaming");
            return Err(CaptureError::NotStreaming.into());
        }

        let handle = inner.handle.as_mut().ok_or(CaptureError::NotStreaming)?;
        let frame = Arc::new(self.capturer.capture(handle)?);

        inner.frame = Some(Arc::clone(&frame));
        inner.stats.captures += 1;
        self.transition(&mut inner, SessionState::Captured);
        Ok(frame)
    }

    /// Uploads the captured frame and maps the response.
    ///
    /// At most one request is in flight; a second call while uploading is
    /// rejected. After a network or response failure the same frame can be
    /// submitted again.
    pub async fn submit(&self) -> Result<ClassificationResult, SessionError> {
        let (epoch, frame, token) = {
            let mut inner = self.lock();
            match &inner.state {
                SessionState::Uploading => return Err(SessionError::SubmissionInProgress),
                state if state.is_busy() => {
                    return Err(SessionError::OperationInProgress(state.name()))
                }
                SessionState::Captured => {}
                SessionState::Failed(failure) if failure.kind().allows_resubmit() => {}
                _ => return Err(SessionError::NothingToSubmit),
            }

            let frame = inner
                .frame
                .clone()
                .ok_or(SessionError::NothingToSubmit)?;
            let token = CancellationToken::new();
            inner.upload = Some(token.clone());
            inner.epoch += 1;
            inner.stats.submissions += 1;
            self.transition(&mut inner, SessionState::Uploading);
            (inner.epoch, frame, token)
        };

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.client.submit(&frame) => Some(result),
        };

        let mut inner = self.lock();
        let outcome = match outcome {
            Some(outcome) if inner.epoch == epoch => outcome,
            _ => {
                inner.stats.stale_discarded += 1;
                tracing::warn!("Discarding classification response after stop");
                return Err(SessionError::Cancelled);
            }
        };
        inner.upload = None;

        match outcome {
            Ok(raw_code) => {
                let result = mapper::map(&raw_code);
                tracing::info!(
                    category = %result.category(),
                    raw_code = %result.raw_code(),
                    "Frame classified"
                );
                inner.stats.record_result(result.category());
                self.transition(&mut inner, SessionState::Resulted(result.clone()));
                Ok(result)
            }
            Err(error) => {
                let kind = failure_kind(&error);
                tracing::warn!(%error, "Classification failed");
                self.fail(&mut inner, kind, &error);
                Err(error.into())
            }
        }
    }

    /// Returns to idle from any state.
    ///
    /// Releases the device synchronously and turns any outstanding acquire or
    /// upload into a no-op when it completes.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Idle && inner.handle.is_none() {
            return;
        }

        inner.epoch += 1;
        if let Some(token) = inner.upload.take() {
            token.cancel();
        }
        self.release_held(&mut inner);
        self.transition(&mut inner, SessionState::Idle);
    }

    /// Stops the session and forces the capture backend to a clean state.
    pub fn reset_device(&self) -> Result<(), SessionError> {
        self.stop();
        self.device.reset()?;
        Ok(())
    }

    /// Tears the session down, releasing any held device.
    pub fn close(self) {
        self.stop();
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Returns the most recent captured frame, if still held.
    pub fn current_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.lock().frame.clone()
    }

    /// Returns the id of the live handle, if any.
    pub fn handle_id(&self) -> Option<HandleId> {
        self.lock().handle.as_ref().map(DeviceHandle::id)
    }

    /// Returns the session counters.
    pub fn stats(&self) -> SessionStats {
        self.lock().stats.clone()
    }

    /// Handles acquired through this session's device resource and not yet
    /// released.
    pub fn live_handles(&self) -> usize {
        self.device.live_handles()
    }

    /// The constraints used for acquisition.
    pub fn constraints(&self) -> &DeviceConstraints {
        &self.constraints
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release_held(&self, inner: &mut Inner) {
        if let Some(mut handle) = inner.handle.take() {
            if self.device.release(&mut handle) {
                inner.stats.releases += 1;
            }
        }
        inner.frame = None;
    }

    fn fail(&self, inner: &mut Inner, kind: FailureKind, error: &dyn std::fmt::Display) {
        inner.stats.record_failure(kind);
        self.transition(inner, SessionState::Failed(Failure::new(kind, error)));
    }

    fn transition(&self, inner: &mut Inner, next: SessionState) {
        tracing::info!(from = %inner.state, to = %next, "Session state changed");
        inner.state = next.clone();
        self.state_tx.send_replace(next);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn failure_kind(error: &ClassifyError) -> FailureKind {
    if error.is_network() {
        FailureKind::Network
    } else {
        FailureKind::InvalidResponse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MockClassificationClient;
    use crate::device::{DeviceAcquisitionError, MockControl, MockDevice};
    use crate::mapper::Category;
    use tokio::sync::Notify;

    struct Fixture {
        session: Arc<CaptureSession>,
        control: Arc<MockControl>,
        client: Arc<MockClassificationClient>,
    }

    fn fixture_with(device: MockDevice, client: MockClassificationClient) -> Fixture {
        let control = device.control();
        let client = Arc::new(client);
        let session = CaptureSession::new(
            DeviceResource::new(device),
            client.clone(),
            DeviceConstraints::default(),
            FrameCapturer::default(),
        );
        Fixture {
            session: Arc::new(session),
            control,
            client,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockDevice::new(), MockClassificationClient::new("0"))
    }

    #[tokio::test]
    async fn test_happy_path() {
        let f = fixture();
        f.client.push_code("2");

        f.session.start().await.unwrap();
        assert_eq!(f.session.state(), SessionState::Streaming);

        let frame = f.session.capture().unwrap();
        assert_eq!((frame.width(), frame.height()), (512, 512));
        assert_eq!(f.session.state(), SessionState::Captured);

        let result = f.session.submit().await.unwrap();
        assert_eq!(result.category(), Category::Red);
        assert_eq!(f.session.state(), SessionState::Resulted(result));
        assert_eq!(f.session.stats().results(Category::Red), 1);
    }

    #[tokio::test]
    async fn test_start_while_streaming_returns_same_handle() {
        let f = fixture();
        let first = f.session.start().await.unwrap();
        let second = f.session.start().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.control.opened(), 1);
    }

    #[tokio::test]
    async fn test_capture_outside_streaming_fails() {
        let f = fixture();
        assert_eq!(
            f.session.capture().unwrap_err(),
            SessionError::Capture(CaptureError::NotStreaming)
        );
        assert_eq!(f.session.state(), SessionState::Idle);
        assert!(f.session.current_frame().is_none());
    }

    #[tokio::test]
    async fn test_capture_error_keeps_state() {
        let f = fixture_with(
            MockDevice::new().with_frame_size(0, 0),
            MockClassificationClient::new("0"),
        );
        f.session.start().await.unwrap();

        assert!(matches!(
            f.session.capture(),
            Err(SessionError::Capture(CaptureError::EmptyFrame { .. }))
        ));
        assert_eq!(f.session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_submit_without_frame() {
        let f = fixture();
        assert_eq!(
            f.session.submit().await.unwrap_err(),
            SessionError::NothingToSubmit
        );

        f.session.start().await.unwrap();
        assert_eq!(
            f.session.submit().await.unwrap_err(),
            SessionError::NothingToSubmit
        );
        assert_eq!(f.client.calls(), 0);
    }

    #[tokio::test]
    async fn test_acquisition_failure_then_retry() {
        let device = MockDevice::new();
        device.fail_next(DeviceAcquisitionError::PermissionDenied("denied".into()));
        let f = fixture_with(device, MockClassificationClient::new("0"));

        let err = f.session.start().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeviceAcquisition(DeviceAcquisitionError::PermissionDenied(_))
        ));
        assert_eq!(
            f.session.state().failure().map(Failure::kind),
            Some(FailureKind::DeviceAcquisition)
        );

        f.session.start().await.unwrap();
        assert_eq!(f.session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_invalid_response_fails_and_resubmits() {
        let f = fixture();
        f.client
            .push_error(ClassifyError::InvalidResponse("garbage".into()));
        f.client.push_code("1");

        f.session.start().await.unwrap();
        f.session.capture().unwrap();

        let err = f.session.submit().await.unwrap_err();
        assert!(err.is_invalid_response());
        assert_eq!(
            f.session.state().failure().map(Failure::kind),
            Some(FailureKind::InvalidResponse)
        );

        let result = f.session.submit().await.unwrap();
        assert_eq!(result.category(), Category::Turbid);
        assert_eq!(f.client.calls(), 2);
    }

    #[tokio::test]
    async fn test_submit_while_uploading_rejected() {
        let gate = Arc::new(Notify::new());
        let f = fixture_with(
            MockDevice::new(),
            MockClassificationClient::new("3").with_gate(gate.clone()),
        );
        f.session.start().await.unwrap();
        f.session.capture().unwrap();

        let (first, second) = tokio::join!(f.session.submit(), async {
            tokio::task::yield_now().await;
            let second = f.session.submit().await;
            gate.notify_one();
            second
        });

        assert_eq!(first.unwrap().category(), Category::Green);
        assert_eq!(second.unwrap_err(), SessionError::SubmissionInProgress);
        assert_eq!(f.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_during_upload_discards_response() {
        let gate = Arc::new(Notify::new());
        let f = fixture_with(
            MockDevice::new(),
            MockClassificationClient::new("2").with_gate(gate.clone()),
        );
        f.session.start().await.unwrap();
        f.session.capture().unwrap();

        let (submitted, _) = tokio::join!(f.session.submit(), async {
            tokio::task::yield_now().await;
            f.session.stop();
            gate.notify_one();
        });

        assert_eq!(submitted.unwrap_err(), SessionError::Cancelled);
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.session.stats().total_results(), 0);
        assert_eq!(f.session.stats().stale_discarded, 1);
        assert_eq!(f.control.live(), 0);
    }

    #[tokio::test]
    async fn test_stop_races_acquire() {
        let gate = Arc::new(Notify::new());
        let f = fixture_with(
            MockDevice::new().with_gate(gate.clone()),
            MockClassificationClient::new("0"),
        );

        let (started, _) = tokio::join!(f.session.start(), async {
            tokio::task::yield_now().await;
            assert_eq!(f.session.state(), SessionState::Acquiring);
            f.session.stop();
            gate.notify_one();
        });

        assert_eq!(started.unwrap_err(), SessionError::Cancelled);
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.control.opened(), 1);
        assert_eq!(f.control.released(), 1);
        assert_eq!(f.session.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_start_while_acquiring_rejected() {
        let gate = Arc::new(Notify::new());
        let f = fixture_with(
            MockDevice::new().with_gate(gate.clone()),
            MockClassificationClient::new("0"),
        );

        let (first, second) = tokio::join!(f.session.start(), async {
            tokio::task::yield_now().await;
            let second = f.session.start().await;
            gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert_eq!(
            second.unwrap_err(),
            SessionError::OperationInProgress("acquiring")
        );
        assert_eq!(f.control.opened(), 1);
    }

    #[tokio::test]
    async fn test_start_replaces_dead_stream() {
        let f = fixture();
        let first = f.session.start().await.unwrap();
        f.control.disconnect_streams();

        assert_eq!(
            f.session.capture().unwrap_err(),
            SessionError::Capture(CaptureError::NotStreaming)
        );

        let second = f.session.start().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(f.control.opened(), 2);
        assert_eq!(f.control.released(), 1);
        assert_eq!(f.session.state(), SessionState::Streaming);
        assert!(f.session.capture().is_ok());
    }

    #[tokio::test]
    async fn test_stop_releases_once() {
        let f = fixture();
        f.session.start().await.unwrap();
        f.session.capture().unwrap();

        f.session.stop();
        f.session.stop();

        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.control.opened(), 1);
        assert_eq!(f.control.released(), 1);
        assert!(f.session.current_frame().is_none());
        assert!(f.session.handle_id().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_device() {
        let f = fixture();
        f.session.start().await.unwrap();
        let control = f.control.clone();

        drop(f);
        assert_eq!(control.live(), 0);
    }

    #[tokio::test]
    async fn test_reset_device() {
        let f = fixture();
        f.session.start().await.unwrap();

        f.session.reset_device().unwrap();
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.control.resets(), 1);
        assert_eq!(f.control.live(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let f = fixture();
        let mut rx = f.session.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionState::Idle);

        f.session.start().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_recapture_supersedes_frame() {
        let f = fixture();
        f.session.start().await.unwrap();

        let first = f.session.capture().unwrap();
        f.session.submit().await.unwrap();
        let second = f.session.capture().unwrap();

        assert_ne!(first.sequence(), second.sequence());
        assert_eq!(f.session.state(), SessionState::Captured);
        assert!(Arc::ptr_eq(&f.session.current_frame().unwrap(), &second));
    }
}
