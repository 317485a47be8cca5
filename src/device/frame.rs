//! Raw frame type read from an open stream.

/// Bytes per pixel of a raw frame (packed RGB).
pub const RGB_CHANNELS: usize = 3;

/// A single raw frame read from a capture stream.
///
/// Pixels are packed 8-bit RGB, row-major, with no padding.
#[derive(Clone)]
pub struct RawFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl RawFrame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    /// Consumes the frame and returns the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the per-stream sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        let expected = (self.width as usize) * (self.height as usize) * RGB_CHANNELS;
        self.pixels.len() == expected
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
