//! Conversion of captured bitmap bits into [`CaptureBuffer`]s.
//!
//! A 32-bit bitmap is read as is and stores BGRX top-down without row padding. Any other depth
//! is read through a 24-bit DIB conversion instead, because the stored bits of a low colour
//! depth bitmap are not RGB. DIBs are bottom-up with rows padded to 4 bytes.

use bytemuck::{Pod, Zeroable, cast_slice};
use thiserror::Error;
use tracing::{Level, instrument, trace};

use crate::{CaptureBackend, CaptureBuffer, NativeBitmapInfo, NativeError};

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
struct Bgrx {
    b: u8,
    g: u8,
    r: u8,
    x: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
struct Bgr {
    b: u8,
    g: u8,
    r: u8,
}

/// How the bits of a bitmap are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPath {
    /// The stored 32-bit BGRX bits are reinterpreted.
    Fast,

    /// The bitmap is converted to a 24-bit bottom-up DIB first.
    Slow,
}

impl ExtractionPath {
    /// Selects the path for a bitmap.
    pub fn for_bitmap(info: &NativeBitmapInfo) -> Self {
        if info.bits_per_pixel == 32 && info.width_bytes as usize == info.width as usize * 4 {
            Self::Fast
        } else {
            Self::Slow
        }
    }
}

/// Bytes per row of a DIB, rows are padded to a multiple of 4 bytes.
pub fn dib_row_stride(width: u32, bits_per_pixel: u16) -> usize {
    (width as usize * usize::from(bits_per_pixel)).div_ceil(32) * 4
}

/// Reads a captured bitmap into top-down RGB24.
pub struct PixelExtractor<'a, B: ?Sized> {
    backend: &'a B,
}

impl<'a, B: CaptureBackend + ?Sized> PixelExtractor<'a, B> {
    /// Creates an extractor reading through `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Reads `bitmap` into a buffer.
    #[instrument("PixelExtractor::extract", level = Level::DEBUG, skip_all, err)]
    pub fn extract(
        &self,
        device: &B::Device,
        bitmap: &B::Bitmap,
    ) -> Result<CaptureBuffer, PixelExtractionFailed> {
        let info = self.backend.bitmap_info(bitmap)?;
        let path = ExtractionPath::for_bitmap(&info);
        trace!("Extracting {info:?} using the {path:?} path");

        match path {
            ExtractionPath::Fast => {
                let bits = self.backend.bitmap_bits(bitmap, &info)?;
                bgrx_to_rgb(info.width, info.height, &bits)
            }

            ExtractionPath::Slow => {
                let bits = self.backend.dib_bits(device, bitmap, &info)?;
                bottom_up_bgr_to_rgb(info.width, info.height, &bits)
            }
        }
    }
}

/// Converts top-down, unpadded BGRX bits to RGB24.
pub fn bgrx_to_rgb(
    width: u32,
    height: u32,
    bits: &[u8],
) -> Result<CaptureBuffer, PixelExtractionFailed> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(PixelExtractionFailed::TooLarge { width, height })?;

    if bits.len() != expected {
        return Err(PixelExtractionFailed::ByteCount {
            expected,
            actual: bits.len(),
        });
    }

    let pixels: &[Bgrx] = cast_slice(bits);
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    for pixel in pixels {
        rgb.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
    }

    CaptureBuffer::from_rgb(width, height, rgb).ok_or(PixelExtractionFailed::TooLarge { width, height })
}

/// Converts bottom-up BGR bits with rows padded to 4 bytes into top-down RGB24.
pub fn bottom_up_bgr_to_rgb(
    width: u32,
    height: u32,
    bits: &[u8],
) -> Result<CaptureBuffer, PixelExtractionFailed> {
    if width == 0 || height == 0 {
        return Err(PixelExtractionFailed::Empty { width, height });
    }

    let stride = dib_row_stride(width, 24);
    let row_length = width as usize * 3;
    let expected = stride
        .checked_mul(height as usize)
        .ok_or(PixelExtractionFailed::TooLarge { width, height })?;

    if bits.len() != expected {
        return Err(PixelExtractionFailed::ByteCount {
            expected,
            actual: bits.len(),
        });
    }

    let mut rgb = Vec::with_capacity(row_length * height as usize);
    for row in bits.chunks_exact(stride).rev() {
        let pixels: &[Bgr] = cast_slice(&row[..row_length]);
        for pixel in pixels {
            rgb.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
        }
    }

    CaptureBuffer::from_rgb(width, height, rgb).ok_or(PixelExtractionFailed::TooLarge { width, height })
}

/// The bitmap bits could not be read or did not have the expected layout.
#[derive(Debug, Error)]
pub enum PixelExtractionFailed {
    #[error("Failed to read the bitmap bits:\n{0}")]
    Native(#[from] NativeError),

    #[error("Expected {expected} bytes of bitmap bits, got {actual}")]
    ByteCount { expected: usize, actual: usize },

    #[error("A {width}x{height} bitmap has no pixels")]
    Empty { width: u32, height: u32 },

    #[error("A {width}x{height} bitmap is too large to extract")]
    TooLarge { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dib_stride_is_padded() {
        assert_eq!(dib_row_stride(1, 24), 4);
        assert_eq!(dib_row_stride(4, 24), 12);
        assert_eq!(dib_row_stride(5, 24), 16);
        assert_eq!(dib_row_stride(3, 16), 8);
        assert_eq!(dib_row_stride(3, 8), 4);
        assert_eq!(dib_row_stride(33, 1), 8);
        assert_eq!(dib_row_stride(7, 32), 28);
    }

    #[test]
    fn path_selection() {
        let mut info = NativeBitmapInfo {
            width: 10,
            height: 2,
            bits_per_pixel: 32,
            width_bytes: 40,
        };
        assert_eq!(ExtractionPath::for_bitmap(&info), ExtractionPath::Fast);

        info.bits_per_pixel = 16;
        info.width_bytes = 20;
        assert_eq!(ExtractionPath::for_bitmap(&info), ExtractionPath::Slow);

        info.bits_per_pixel = 24;
        info.width_bytes = 32;
        assert_eq!(ExtractionPath::for_bitmap(&info), ExtractionPath::Slow);
    }

    #[test]
    fn fast_path_drops_padding_byte() {
        // 2x1: blue pixel then white pixel
        let bits = [0xFF, 0x00, 0x00, 0x7F, 0xFF, 0xFF, 0xFF, 0x00];
        let buffer = bgrx_to_rgb(2, 1, &bits).unwrap();

        assert_eq!(buffer.bytes(), &[0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(buffer.row_stride(), 6);
    }

    #[test]
    fn slow_path_flips_and_unpads() {
        // 1x2, stride 4. Bottom row (stored first) is red, top row is green.
        let bits = [0x00, 0x00, 0xFF, 0xEE, 0x00, 0xFF, 0x00, 0xEE];
        let buffer = bottom_up_bgr_to_rgb(1, 2, &bits).unwrap();

        assert_eq!(buffer.pixel(0, 0), Some([0x00, 0xFF, 0x00]));
        assert_eq!(buffer.pixel(0, 1), Some([0xFF, 0x00, 0x00]));
        assert_eq!(buffer.bytes().len(), 6);
    }

    #[test]
    fn byte_count_mismatch() {
        assert!(matches!(
            bgrx_to_rgb(2, 2, &[0; 15]),
            Err(PixelExtractionFailed::ByteCount {
                expected: 16,
                actual: 15
            })
        ));
        assert!(matches!(
            bottom_up_bgr_to_rgb(5, 2, &[0; 30]),
            Err(PixelExtractionFailed::ByteCount {
                expected: 32,
                actual: 30
            })
        ));
    }
}
