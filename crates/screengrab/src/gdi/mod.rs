//! Capture through the Windows Graphics Device Interface.

mod bits;
mod geometry;
mod handles;

use windows::Win32::Foundation::GetLastError;

use crate::{CaptureBackend, LabelledNativeResult, NativeBitmapInfo, NativeDib, NativeError, Rect};

pub use handles::{GdiBitmap, GdiDevice};

/// The GDI platform, reads geometry from the window manager and copies pixels with `BitBlt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gdi;

/// Wraps the calling thread's last error for a native call that signalled failure.
fn last_error(call: &'static str) -> NativeError {
    let code = unsafe { GetLastError() };
    NativeError::from_win32(code.0, call)
}

impl CaptureBackend for Gdi {
    type Device = GdiDevice;
    type Bitmap = GdiBitmap;

    fn acquire_device(&self) -> LabelledNativeResult<GdiDevice> {
        GdiDevice::acquire()
    }

    fn release_device(&self, device: &GdiDevice) {
        device.release();
    }

    fn allocate_bitmap(
        &self,
        device: &GdiDevice,
        width: u32,
        height: u32,
    ) -> LabelledNativeResult<GdiBitmap> {
        GdiBitmap::allocate(device, width, height)
    }

    fn release_bitmap(&self, device: &GdiDevice, bitmap: &GdiBitmap) {
        bitmap.release(device);
    }

    fn blit(&self, device: &GdiDevice, bitmap: &GdiBitmap, source: Rect) -> LabelledNativeResult<()> {
        bitmap.blit(device, source)
    }

    fn bitmap_info(&self, bitmap: &GdiBitmap) -> LabelledNativeResult<NativeBitmapInfo> {
        bits::bitmap_info(bitmap)
    }

    fn bitmap_bits(
        &self,
        bitmap: &GdiBitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>> {
        bits::bitmap_bits(bitmap, info)
    }

    fn dib_bits(
        &self,
        device: &GdiDevice,
        bitmap: &GdiBitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>> {
        bits::dib_bits(device, bitmap, info)
    }

    fn native_dib(
        &self,
        device: &GdiDevice,
        bitmap: &GdiBitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<NativeDib> {
        bits::native_dib(device, bitmap, info)
    }
}
