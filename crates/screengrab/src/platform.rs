//! The seams between the capture pipeline and the operating system.

use crate::{LabelledNativeResult, NativeDib, Rect};

/// Source of raw, unvalidated display geometry.
///
/// Reads may be transiently inconsistent while the display configuration is changing, callers
/// are expected to go through [`GeometryStabilizer`](crate::GeometryStabilizer).
pub trait GeometrySource {
    /// Reads the rect of the whole virtual screen.
    fn virtual_screen_rect(&self) -> LabelledNativeResult<Rect>;

    /// Reads the rect of each display in enumeration order.
    fn display_rects(&self) -> LabelledNativeResult<Vec<Rect>>;
}

/// The properties of a captured bitmap as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeBitmapInfo {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Bits per pixel of the bitmap, follows the display colour depth.
    pub bits_per_pixel: u16,

    /// Bytes per scan line.
    pub width_bytes: u32,
}

/// Native drawing operations used by a [`CaptureSession`](crate::CaptureSession).
///
/// Every successful `acquire_device` is paired with exactly one `release_device`, and every
/// successful `allocate_bitmap` with exactly one `release_bitmap`. The session enforces this,
/// implementations only need to release what they are handed. A handle is never used after it
/// has been released.
pub trait CaptureBackend {
    /// The drawing surface for the desktop and a compatible off-screen surface.
    type Device;

    /// An off-screen bitmap selected into a device.
    type Bitmap;

    /// Acquires the drawing surfaces for the full desktop.
    fn acquire_device(&self) -> LabelledNativeResult<Self::Device>;

    /// Releases a device, errors are reported through the logger.
    fn release_device(&self, device: &Self::Device);

    /// Allocates a bitmap compatible with the desktop surface.
    fn allocate_bitmap(
        &self,
        device: &Self::Device,
        width: u32,
        height: u32,
    ) -> LabelledNativeResult<Self::Bitmap>;

    /// Releases a bitmap, errors are reported through the logger.
    fn release_bitmap(&self, device: &Self::Device, bitmap: &Self::Bitmap);

    /// Copies the pixels inside `source` from the desktop into the bitmap.
    fn blit(
        &self,
        device: &Self::Device,
        bitmap: &Self::Bitmap,
        source: Rect,
    ) -> LabelledNativeResult<()>;

    /// Reports the size and bit depth of a bitmap.
    fn bitmap_info(&self, bitmap: &Self::Bitmap) -> LabelledNativeResult<NativeBitmapInfo>;

    /// The bitmap's bits as stored, top-down.
    fn bitmap_bits(
        &self,
        bitmap: &Self::Bitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>>;

    /// The bitmap converted to a bottom-up 24-bit BGR DIB with rows padded to 4 bytes.
    fn dib_bits(
        &self,
        device: &Self::Device,
        bitmap: &Self::Bitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>>;

    /// The bitmap as a DIB at its own bit depth.
    fn native_dib(
        &self,
        device: &Self::Device,
        bitmap: &Self::Bitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<NativeDib>;
}
