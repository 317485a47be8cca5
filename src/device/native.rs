//! Native camera backend built on `nokhwa`.
//!
//! `nokhwa` cameras are not `Send`, so each stream lives on its own worker
//! thread and is driven through a command channel.

use super::{
    CaptureBackend, DeviceAcquisitionError, DeviceConstraints, DeviceError, RawFrame,
    StreamError, VideoStream,
};
use async_trait::async_trait;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

enum Command {
    Frame(mpsc::Sender<Result<RawFrame, StreamError>>),
    Stop,
}

#[derive(Debug)]
struct Worker {
    thread: JoinHandle<()>,
    stopped: Arc<AtomicBool>,
}

impl Worker {
    /// Stopped streams wind down on their own; joining them only waits for
    /// the camera to close.
    fn is_releasable(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.thread.is_finished()
    }
}

/// Capture backend for local cameras.
#[derive(Debug, Default)]
pub struct NativeDevice {
    workers: Mutex<Vec<Worker>>,
}

impl NativeDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaptureBackend for NativeDevice {
    async fn open(
        &self,
        constraints: &DeviceConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceAcquisitionError> {
        {
            let mut workers = self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let joined = prune_finished(&mut workers);
            if joined > 0 {
                tracing::debug!(joined, "Joined finished camera workers");
            }
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let constraints = constraints.clone();

        let thread = thread::Builder::new()
            .name(format!("camera-{}", constraints.device_index))
            .spawn(move || run_worker(constraints, ready_tx, command_rx))
            .map_err(|e| DeviceAcquisitionError::OpenFailed(e.to_string()))?;

        let opened = ready_rx.await.map_err(|_| {
            DeviceAcquisitionError::OpenFailed("camera worker exited during open".into())
        })?;

        match opened {
            Ok(()) => {
                let stopped = Arc::new(AtomicBool::new(false));
                self.workers
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(Worker {
                        thread,
                        stopped: Arc::clone(&stopped),
                    });
                Ok(Box::new(NativeStream {
                    commands: command_tx,
                    stopped,
                }))
            }
            Err(error) => {
                let _ = thread.join();
                Err(error)
            }
        }
    }

    fn reset(&self) -> Result<(), DeviceError> {
        let mut workers = self
            .workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (finished, running): (Vec<_>, Vec<_>) =
            workers.drain(..).partition(Worker::is_releasable);
        for worker in finished {
            let _ = worker.thread.join();
        }
        if !running.is_empty() {
            let count = running.len();
            *workers = running;
            return Err(DeviceError::InUse(count));
        }

        // Re-enumerate so the platform layer drops stale device state.
        nokhwa::query(ApiBackend::Auto)
            .map(|devices| tracing::debug!(devices = devices.len(), "Cameras re-enumerated"))
            .map_err(|e| DeviceError::ResetFailed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Joins workers whose thread has already exited. Never blocks.
fn prune_finished(workers: &mut Vec<Worker>) -> usize {
    let (finished, running): (Vec<_>, Vec<_>) =
        workers.drain(..).partition(|w| w.thread.is_finished());
    *workers = running;
    let joined = finished.len();
    for worker in finished {
        let _ = worker.thread.join();
    }
    joined
}

fn run_worker(
    constraints: DeviceConstraints,
    ready: oneshot::Sender<Result<(), DeviceAcquisitionError>>,
    commands: mpsc::Receiver<Command>,
) {
    let mut camera = match open_camera(&constraints) {
        Ok(camera) => camera,
        Err(error) => {
            let _ = ready.send(Err(error));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        // Acquirer went away before the stream was handed out.
        let _ = camera.stop_stream();
        return;
    }

    let mut sequence = 0u64;
    while let Ok(command) = commands.recv() {
        match command {
            Command::Frame(reply) => {
                sequence += 1;
                let _ = reply.send(read_frame(&mut camera, sequence));
            }
            Command::Stop => break,
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!(error = %e, "Failed to stop camera stream cleanly");
    }
}

fn open_camera(constraints: &DeviceConstraints) -> Result<Camera, DeviceAcquisitionError> {
    let format = CameraFormat::new(
        Resolution::new(constraints.width, constraints.height),
        FrameFormat::MJPEG,
        constraints.fps,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut camera = Camera::new(CameraIndex::Index(constraints.device_index), requested)
        .map_err(|e| classify_open_error(&e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| classify_open_error(&e.to_string()))?;
    Ok(camera)
}

fn read_frame(camera: &mut Camera, sequence: u64) -> Result<RawFrame, StreamError> {
    let buffer = camera
        .frame()
        .map_err(|e| StreamError::ReadFailed(e.to_string()))?;
    let image = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| StreamError::ReadFailed(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    Ok(RawFrame::new(image.into_raw(), width, height, sequence))
}

/// Sorts platform open errors into the acquisition taxonomy.
fn classify_open_error(message: &str) -> DeviceAcquisitionError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("authoriz") {
        DeviceAcquisitionError::PermissionDenied(message.to_string())
    } else if lower.contains("busy") || lower.contains("in use") {
        DeviceAcquisitionError::Busy(message.to_string())
    } else if lower.contains("not found") || lower.contains("no device") || lower.contains("index")
    {
        DeviceAcquisitionError::NotFound(message.to_string())
    } else {
        DeviceAcquisitionError::OpenFailed(message.to_string())
    }
}

struct NativeStream {
    commands: mpsc::Sender<Command>,
    stopped: Arc<AtomicBool>,
}

impl VideoStream for NativeStream {
    fn is_active(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn read_frame(&mut self) -> Result<RawFrame, StreamError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.commands.send(Command::Frame(reply_tx)).is_err() {
            self.stopped.store(true, Ordering::SeqCst);
            return Err(StreamError::Inactive);
        }
        reply_rx.recv().map_err(|_| {
            self.stopped.store(true, Ordering::SeqCst);
            StreamError::Inactive
        })?
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.commands.send(Command::Stop);
    }
}
