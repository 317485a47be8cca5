use crate::capture::CaptureError;
use crate::classify::ClassifyError;
use crate::device::{DeviceAcquisitionError, DeviceError};
use thiserror::Error;

/// Errors returned by [`CaptureSession`](super::CaptureSession) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    DeviceAcquisition(#[from] DeviceAcquisitionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Reset(#[from] DeviceError),
    #[error("submission in progress")]
    SubmissionInProgress,
    #[error("operation in progress (session is {0})")]
    OperationInProgress(&'static str),
    #[error("no captured frame to submit")]
    NothingToSubmit,
    #[error("operation cancelled by stop")]
    Cancelled,
}

impl SessionError {
    /// True for transport failures and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, SessionError::Classify(e) if e.is_network())
    }

    /// True for malformed response bodies.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, SessionError::Classify(ClassifyError::InvalidResponse(_)))
    }
}
