//! Session state values.

use crate::mapper::ClassificationResult;
use std::fmt;

/// Why a session entered the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The device could not be acquired.
    DeviceAcquisition,
    /// Transport failure or non-success status.
    Network,
    /// The service answered with a body that could not be read.
    InvalidResponse,
}

impl FailureKind {
    pub const ALL: [FailureKind; 3] = [
        FailureKind::DeviceAcquisition,
        FailureKind::Network,
        FailureKind::InvalidResponse,
    ];

    /// Position in [`FailureKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            FailureKind::DeviceAcquisition => 0,
            FailureKind::Network => 1,
            FailureKind::InvalidResponse => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureKind::DeviceAcquisition => "device_acquisition",
            FailureKind::Network => "network",
            FailureKind::InvalidResponse => "invalid_response",
        }
    }

    /// True if `submit()` may retry the retained frame.
    pub fn allows_resubmit(self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::InvalidResponse)
    }
}

/// Failure recorded in [`SessionState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl fmt::Display) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    #[inline]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

/// State of a capture-classify session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No device held.
    #[default]
    Idle,
    /// Waiting for the device (or a permission grant).
    Acquiring,
    /// Device open, no frame captured yet.
    Streaming,
    /// A frame is ready for submission; the stream stays open.
    Captured,
    /// A classification request is in flight.
    Uploading,
    /// The last submission produced a result; the stream stays open.
    Resulted(ClassificationResult),
    /// The last operation failed. `start()` is always accepted.
    Failed(Failure),
}

impl SessionState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Streaming => "streaming",
            SessionState::Captured => "captured",
            SessionState::Uploading => "uploading",
            SessionState::Resulted(_) => "resulted",
            SessionState::Failed(_) => "failed",
        }
    }

    /// True in states where the device stream is open and frames can be taken.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            SessionState::Streaming | SessionState::Captured | SessionState::Resulted(_)
        )
    }

    /// True while a suspending operation is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Acquiring | SessionState::Uploading)
    }

    /// Returns the result when in `Resulted`.
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            SessionState::Resulted(result) => Some(result),
            _ => None,
        }
    }

    /// Returns the failure when in `Failed`.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            SessionState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Resulted(result) => write!(f, "resulted({})", result.category()),
            SessionState::Failed(failure) => write!(f, "failed({})", failure.kind().label()),
            other => f.write_str(other.name()),
        }
    }
}
