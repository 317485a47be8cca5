//! Still-frame capture and encoding.
//!
//! The [`FrameCapturer`] reads the current frame from a live device handle,
//! centre-crops and resizes it to the configured target, and encodes it as
//! PNG. Capture is synchronous and never suspends.

mod capturer;
mod frame;

pub use capturer::{CaptureError, CaptureSettings, FrameCapturer};
pub use frame::{CapturedFrame, FrameEncoding};
