mod common;

use capture_classify::capture::{CaptureSettings, FrameCapturer};
use capture_classify::classify::{ClassifierSettings, HttpClassificationClient};
use capture_classify::device::{DeviceConstraints, DeviceResource, MockControl, MockDevice};
use capture_classify::mapper::Category;
use capture_classify::session::{CaptureSession, FailureKind, SessionState};
use common::{FakeService, Reply};
use std::sync::Arc;
use tokio::sync::Notify;

fn session(base_url: &str) -> (CaptureSession, Arc<MockControl>) {
    session_with(MockDevice::new(), base_url)
}

fn session_with(device: MockDevice, base_url: &str) -> (CaptureSession, Arc<MockControl>) {
    let control = device.control();
    let client =
        HttpClassificationClient::new(base_url, ClassifierSettings::default()).unwrap();
    let session = CaptureSession::new(
        DeviceResource::new(device),
        Arc::new(client),
        DeviceConstraints::default(),
        FrameCapturer::new(CaptureSettings::default()),
    );
    (session, control)
}

#[tokio::test]
async fn code_two_is_red() {
    let service = FakeService::new(Reply::Body("\"2\"".into()));
    let (session, control) = session(&service.spawn().await);

    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
    session.capture().unwrap();
    assert_eq!(session.state(), SessionState::Captured);

    let result = session.submit().await.unwrap();
    assert_eq!(result.category(), Category::Red);
    assert_eq!(result.raw_code(), "2");
    assert_eq!(session.state(), SessionState::Resulted(result));

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(control.opened(), 1);
    assert_eq!(control.released(), 1);
    assert_eq!(control.live(), 0);
}

#[tokio::test]
async fn unrecognised_code_is_unknown() {
    let service = FakeService::new(Reply::Body("7".into()));
    let (session, _control) = session(&service.spawn().await);

    session.start().await.unwrap();
    session.capture().unwrap();
    let result = session.submit().await.unwrap();

    assert_eq!(result.category(), Category::Unknown);
    assert_eq!(result.raw_code(), "7");
    assert!(result.is_unknown());
}

#[tokio::test]
async fn network_failure_then_restart() {
    let gate = Arc::new(Notify::new());
    let (session, control) = session_with(
        MockDevice::new().with_gate(gate.clone()),
        &common::unreachable_base_url().await,
    );

    gate.notify_one();
    session.start().await.unwrap();
    session.capture().unwrap();
    let error = session.submit().await.unwrap_err();
    assert!(error.is_network());

    let state = session.state();
    assert_eq!(state.failure().unwrap().kind(), FailureKind::Network);
    assert!(session.current_frame().is_some());

    let mut changes = session.subscribe();
    let (restarted, observed) = tokio::join!(session.start(), async {
        changes.changed().await.unwrap();
        let observed = changes.borrow_and_update().clone();
        gate.notify_one();
        observed
    });
    restarted.unwrap();
    assert_eq!(observed, SessionState::Acquiring);
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(control.opened(), 2);
    assert_eq!(control.released(), 1);
    assert_eq!(session.live_handles(), 1);
}

#[tokio::test]
async fn recapture_sends_latest_frame() {
    let service = FakeService::new(Reply::Body("0".into()));
    let (session, _control) = session(&service.spawn().await);

    session.start().await.unwrap();
    session.capture().unwrap();
    let latest = session.capture().unwrap();
    let result = session.submit().await.unwrap();
    assert_eq!(result.category(), Category::Normal);

    let uploads = service.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bytes, latest.data());
}

#[tokio::test]
async fn classify_again_after_result() {
    let service = FakeService::new(Reply::Body("1".into()));
    let (session, _control) = session(&service.spawn().await);

    session.start().await.unwrap();
    session.capture().unwrap();
    assert_eq!(session.submit().await.unwrap().category(), Category::Turbid);

    service.set_reply(Reply::Body("3".into()));
    session.capture().unwrap();
    assert_eq!(session.submit().await.unwrap().category(), Category::Green);

    let stats = session.stats();
    assert_eq!(stats.submissions, 2);
    assert_eq!(stats.results(Category::Turbid), 1);
    assert_eq!(stats.results(Category::Green), 1);
}

#[tokio::test]
async fn server_error_allows_resubmit() {
    let service = FakeService::new(Reply::Status(503, "busy".into()));
    let (session, _control) = session(&service.spawn().await);

    session.start().await.unwrap();
    session.capture().unwrap();
    assert!(session.submit().await.unwrap_err().is_network());

    service.set_reply(Reply::Body("2".into()));
    let result = session.submit().await.unwrap();
    assert_eq!(result.category(), Category::Red);

    let uploads = service.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].bytes, uploads[1].bytes);
}
