//! The capture-classify session.
//!
//! A [`CaptureSession`] owns at most one device handle and moves through
//! these states:
//!
//! ```text
//! Idle --start--> Acquiring --ok--> Streaming --capture--> Captured
//!                     |                                       |
//!                     +--err--> Failed <--err-- Uploading <--submit
//!                                                   |
//!                                                   +--ok--> Resulted
//! ```
//!
//! `stop()` returns any state to Idle at once. Operations that were
//! suspended when it ran complete as no-ops and report
//! [`SessionError::Cancelled`].

mod error;
mod machine;
mod state;
mod stats;

pub use error::SessionError;
pub use machine::CaptureSession;
pub use state::{Failure, FailureKind, SessionState};
pub use stats::SessionStats;
