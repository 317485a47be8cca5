//! Capture Classify Library
//!
//! Acquires a video device, captures a still frame, submits it to a remote
//! classification service and maps the returned code to a category.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! device → capture → classify → mapper
//!     ↑                            ↓
//!           session (state machine)
//! ```
//!
//! # Design Principles
//!
//! - **One handle at a time**: every acquired device handle is released exactly once
//! - **Stop always wins**: completions that arrive after `stop()` are discarded
//! - **Total mapping**: every service response maps to a category, unrecognised codes to `Unknown`
//! - **Swappable collaborators**: device backends and classification clients are traits
//!
//! # Example
//!
//! ```no_run
//! use capture_classify::{
//!     capture::{CaptureSettings, FrameCapturer},
//!     classify::MockClassificationClient,
//!     device::{DeviceConstraints, DeviceResource, MockDevice},
//!     session::CaptureSession,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), capture_classify::session::SessionError> {
//! let session = CaptureSession::new(
//!     DeviceResource::new(MockDevice::new()),
//!     Arc::new(MockClassificationClient::new("2")),
//!     DeviceConstraints::default(),
//!     FrameCapturer::new(CaptureSettings::default()),
//! );
//!
//! session.start().await?;
//! session.capture()?;
//! let result = session.submit().await?;
//! println!("{}", result.category());
//! session.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod api;
pub mod capture;
pub mod classify;
pub mod config;
pub mod device;
pub mod mapper;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{CapturedFrame, FrameCapturer};
pub use classify::{ClassificationClient, HttpClassificationClient};
pub use config::AppConfig;
pub use device::{DeviceConstraints, DeviceResource};
pub use mapper::{Category, ClassificationResult};
pub use session::{CaptureSession, SessionError, SessionState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
