//! Constraints used when acquiring a capture device.

use serde::{Deserialize, Serialize};

/// What the session asks of the capture device.
///
/// The dimensions are a preference: backends open the closest mode they
/// support, and the frame capturer rescales afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConstraints {
    /// Camera device index.
    pub device_index: u32,
    /// Preferred stream width in pixels.
    pub width: u32,
    /// Preferred stream height in pixels.
    pub height: u32,
    /// Preferred frames per second.
    pub fps: u32,
}

impl Default for DeviceConstraints {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl DeviceConstraints {
    /// Creates constraints with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the constraint values.
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConstraintError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConstraintError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Constraint validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("invalid stream dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
}
