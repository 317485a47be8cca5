//! Still-frame extraction from an active stream.

use super::{CapturedFrame, FrameEncoding};
use crate::device::{DeviceHandle, RawFrame, StreamError};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Errors that can occur while capturing a still frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no active stream to capture from")]
    NotStreaming,
    #[error("frame has zero dimensions ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },
    #[error("frame buffer does not match {width}x{height} RGB")]
    MalformedFrame { width: u32, height: u32 },
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl From<StreamError> for CaptureError {
    fn from(error: StreamError) -> Self {
        match error {
            StreamError::Inactive | StreamError::Released => CaptureError::NotStreaming,
            StreamError::ReadFailed(msg) => CaptureError::ReadFailed(msg),
        }
    }
}

/// Capture settings: output size and framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Crop the centre of the frame to the target aspect ratio before
    /// resizing, instead of stretching.
    pub center_crop: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            center_crop: true,
        }
    }
}

/// Extracts single frames from a stream into fixed-size PNG buffers.
#[derive(Debug, Clone)]
pub struct FrameCapturer {
    settings: CaptureSettings,
    filter: FilterType,
}

impl FrameCapturer {
    /// Creates a capturer producing frames of the given size.
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            filter: FilterType::Triangle,
        }
    }

    /// Returns the capture settings.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Captures the current frame at the configured size.
    pub fn capture(&self, handle: &mut DeviceHandle) -> Result<CapturedFrame, CaptureError> {
        self.capture_at(handle, self.settings.width, self.settings.height)
    }

    /// Captures the current frame at an explicit size.
    pub fn capture_at(
        &self,
        handle: &mut DeviceHandle,
        target_width: u32,
        target_height: u32,
    ) -> Result<CapturedFrame, CaptureError> {
        if target_width == 0 || target_height == 0 {
            return Err(CaptureError::InvalidTarget {
                width: target_width,
                height: target_height,
            });
        }
        if !handle.is_streaming() {
            return Err(CaptureError::NotStreaming);
        }

        let raw = handle.read_frame()?;
        let frame = self.encode(raw, target_width, target_height)?;

        tracing::debug!(
            handle = %handle.id(),
            width = frame.width(),
            height = frame.height(),
            bytes = frame.data().len(),
            "Frame captured"
        );
        Ok(frame)
    }

    /// Resizes and PNG-encodes a raw frame.
    pub fn encode(
        &self,
        raw: RawFrame,
        target_width: u32,
        target_height: u32,
    ) -> Result<CapturedFrame, CaptureError> {
        let (width, height) = (raw.width(), raw.height());
        if raw.is_empty() {
            return Err(CaptureError::EmptyFrame { width, height });
        }
        if !raw.is_valid() {
            return Err(CaptureError::MalformedFrame { width, height });
        }

        let sequence = raw.sequence();
        let mut image = RgbImage::from_raw(width, height, raw.into_pixels())
            .ok_or(CaptureError::MalformedFrame { width, height })?;

        if self.settings.center_crop {
            let (x, y, w, h) = center_crop_rect(width, height, target_width, target_height);
            if (w, h) != (width, height) {
                image = imageops::crop_imm(&image, x, y, w, h).to_image();
            }
        }
        if image.dimensions() != (target_width, target_height) {
            image = imageops::resize(&image, target_width, target_height, self.filter);
        }

        let mut data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        Ok(CapturedFrame::new(
            data,
            target_width,
            target_height,
            FrameEncoding::Png,
            sequence,
        ))
    }
}

impl Default for FrameCapturer {
    fn default() -> Self {
        Self::new(CaptureSettings::default())
    }
}

/// Largest centred rectangle of `width`x`height` with the target aspect ratio.
fn center_crop_rect(
    width: u32,
    height: u32,
    target_w: u32,
    target_h: u32,
) -> (u32, u32, u32, u32) {
    // Compare width/height against target_w/target_h without floats.
    let lhs = width as u64 * target_h as u64;
    let rhs = height as u64 * target_w as u64;

    let (w, h) = if lhs > rhs {
        // Too wide
        ((rhs / target_h as u64).max(1) as u32, height)
    } else {
        (width, (lhs / target_w as u64).max(1) as u32)
    };
    ((width - w) / 2, (height - h) / 2, w, h)
}
