//! Encoded still frame produced by the frame capturer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Encoding of a captured frame's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEncoding {
    Png,
}

impl FrameEncoding {
    /// MIME type used when uploading.
    pub fn mime_type(self) -> &'static str {
        match self {
            FrameEncoding::Png => "image/png",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FrameEncoding::Png => "png",
        }
    }
}

/// A still frame, resized and encoded for upload.
///
/// Immutable once built. A later capture produces a new value rather than
/// changing this one.
#[derive(Clone)]
pub struct CapturedFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    encoding: FrameEncoding,
    captured_at: DateTime<Utc>,
    sequence: u64,
}

impl CapturedFrame {
    pub(crate) fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        encoding: FrameEncoding,
        sequence: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            encoding,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Returns the encoded image bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn encoding(&self) -> FrameEncoding {
        self.encoding
    }

    /// Wall-clock capture time.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Sequence number of the stream frame this was built from.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Suggested upload file name, e.g. `capture-20241004T101500Z.png`.
    pub fn file_name(&self) -> String {
        format!(
            "capture-{}.{}",
            self.captured_at.format("%Y%m%dT%H%M%SZ"),
            self.encoding.extension()
        )
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoding", &self.encoding)
            .field("captured_at", &self.captured_at)
            .field("sequence", &self.sequence)
            .field("encoded_bytes", &self.data.len())
            .finish()
    }
}
