//! # Screengrab
//!
//! Screenshots of the whole virtual screen, a region of it, or each display, that stay correct
//! while the display configuration is changing.
//!
//! Display geometry is only trusted once two consecutive reads agree, every native handle taken
//! for a capture is released before the capture returns, and captured bits of any colour depth
//! are normalized to top-down RGB24.

mod bmp;
mod buffer;
mod compositor;
mod config;
mod error;
mod extract;
mod geometry;
mod platform;
mod rect;
mod result;
mod screen_grab;
mod session;

#[cfg(windows)]
mod gdi;

pub use bmp::{BmpError, NativeDib};
pub use buffer::{CaptureBuffer, CropError, RGB24_BYTES_PER_PIXEL};
pub use compositor::{DisplayCompositor, DisplaysOutsideCapture};
pub use config::{Config, DEFAULT_STABILIZE_ATTEMPTS};
pub use error::{CaptureError, FailureSource, SaveError, Stage};
pub use extract::{
    ExtractionPath, PixelExtractionFailed, PixelExtractor, bgrx_to_rgb, bottom_up_bgr_to_rgb,
    dib_row_stride,
};
pub use geometry::{Geometry, GeometryStabilizer, GeometryUnavailable};
pub use platform::{CaptureBackend, GeometrySource, NativeBitmapInfo};
pub use rect::{InvalidRect, Rect, normalize_rects};
pub use result::{LabelledNativeResult, NativeError, NativeErrorSource};
pub use screen_grab::ScreenGrab;
pub use session::CaptureSession;

#[cfg(windows)]
pub use gdi::{Gdi, GdiBitmap, GdiDevice};
