use thiserror::Error;

use crate::Rect;

/// Bytes per pixel of a [`CaptureBuffer`].
pub const RGB24_BYTES_PER_PIXEL: usize = 3;

/// A capture normalized to top-down, row-major RGB24.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureBuffer {
    width: u32,
    height: u32,
    row_stride: usize,
    bytes: Vec<u8>,
}

impl CaptureBuffer {
    /// Wraps tightly packed top-down RGB24 bytes.
    ///
    /// Returns `None` if `bytes` is not exactly `width * height * 3` long.
    pub fn from_rgb(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        let row_stride = width as usize * RGB24_BYTES_PER_PIXEL;

        if bytes.len() != row_stride * height as usize {
            return None;
        }

        Some(Self {
            width,
            height,
            row_stride,
            bytes,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[width, height]`
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Bytes between the start of consecutive rows, at least `width * 3`.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// The raw RGB24 bytes, `height * row_stride` long.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The meaningful bytes of row `y`, `None` if out of bounds.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }

        let start = y as usize * self.row_stride;
        self.bytes
            .get(start..start + self.width as usize * RGB24_BYTES_PER_PIXEL)
    }

    /// The `[r, g, b]` pixel at `(x, y)`, `None` if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width {
            return None;
        }

        let row = self.row(y)?;
        let start = x as usize * RGB24_BYTES_PER_PIXEL;

        Some([row[start], row[start + 1], row[start + 2]])
    }

    /// Copies the region inside `rect` into a new buffer.
    ///
    /// `rect` is relative to this buffer's top-left corner and must lie entirely inside it.
    pub fn crop(&self, rect: Rect) -> Result<Self, CropError> {
        let rect = rect.validate().map_err(|_| CropError::OutOfBounds {
            rect,
            size: self.size(),
        })?;

        let bounds = Rect {
            left: 0,
            top: 0,
            right: i32::try_from(self.width).unwrap_or(i32::MAX),
            bottom: i32::try_from(self.height).unwrap_or(i32::MAX),
        };
        if !bounds.contains_rect(&rect) {
            return Err(CropError::OutOfBounds {
                rect,
                size: self.size(),
            });
        }

        let [width, height] = rect.size();
        let row_length = width as usize * RGB24_BYTES_PER_PIXEL;
        let column_offset = rect.left as usize * RGB24_BYTES_PER_PIXEL;

        let mut bytes = Vec::with_capacity(row_length * height as usize);
        for y in rect.top as usize..rect.bottom as usize {
            let start = y * self.row_stride + column_offset;
            bytes.extend_from_slice(&self.bytes[start..start + row_length]);
        }

        Ok(Self {
            width,
            height,
            row_stride: row_length,
            bytes,
        })
    }
}

impl core::fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("row_stride", &self.row_stride)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A crop rect did not fit inside the buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error("Crop {rect} does not fit inside a capture of size {size:?}")]
    OutOfBounds { rect: Rect, size: [u32; 2] },
}
