use std::path::Path;

use tracing::{Level, info, instrument};

use crate::{
    CaptureBackend, CaptureBuffer, CaptureError, CaptureSession, Config, DisplayCompositor,
    GeometrySource, GeometryStabilizer, GeometryUnavailable, NativeDib, Rect, SaveError, Stage,
};

/// Screen capture on a platform.
///
/// `None` for a rect means the whole virtual screen, read through the geometry stabilizer.
pub struct ScreenGrab<P> {
    platform: P,
    config: Config,
}

#[cfg(windows)]
impl ScreenGrab<crate::Gdi> {
    /// Captures through GDI using the default config.
    pub fn new() -> Self {
        Self::with_platform(crate::Gdi, Config::default())
    }

    /// Captures through GDI.
    pub fn with_config(config: Config) -> Self {
        Self::with_platform(crate::Gdi, config)
    }
}

#[cfg(windows)]
impl Default for ScreenGrab<crate::Gdi> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ScreenGrab<P>
where
    P: GeometrySource + CaptureBackend,
{
    /// Captures through `platform`.
    pub fn with_platform(platform: P, config: Config) -> Self {
        Self { platform, config }
    }

    /// The platform captures go through.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The config used for geometry reads.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The rect of the whole virtual screen once two consecutive reads agree.
    pub fn stable_virtual_screen_rect(&self) -> Result<Rect, GeometryUnavailable> {
        GeometryStabilizer::new(&self.platform, &self.config).stable_virtual_screen_rect()
    }

    /// The rect of each display once two consecutive reads agree.
    pub fn stable_display_rects(&self) -> Result<Vec<Rect>, GeometryUnavailable> {
        GeometryStabilizer::new(&self.platform, &self.config).stable_display_rects()
    }

    /// Captures `rect`, or the whole virtual screen, as top-down RGB24.
    pub fn capture(&self, rect: Option<Rect>) -> Result<CaptureBuffer, CaptureError> {
        let rect = self.resolve_rect(rect)?;
        CaptureSession::new(&self.platform, rect)?.capture()
    }

    /// Captures every display from a single capture of the virtual screen.
    pub fn capture_all_displays(&self) -> Result<Vec<CaptureBuffer>, CaptureError> {
        DisplayCompositor::new(&self.platform, self.config).capture_all_displays()
    }

    /// Captures `rect`, or the whole virtual screen, at the display's bit depth.
    pub fn capture_native(&self, rect: Option<Rect>) -> Result<NativeDib, CaptureError> {
        let rect = self.resolve_rect(rect)?;
        CaptureSession::new(&self.platform, rect)?.capture_native()
    }

    /// Saves `rect`, or the whole virtual screen, as an uncompressed `.bmp` file.
    ///
    /// The file keeps the display's bit depth, which can be below 24 bits per pixel.
    #[instrument("ScreenGrab::save_bmp", level = Level::DEBUG, skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn save_bmp<T: AsRef<Path>>(&self, path: T, rect: Option<Rect>) -> Result<(), SaveError> {
        let dib = self.capture_native(rect)?;
        dib.save(&path)?;

        info!(
            "Saved {}x{} {} bit bitmap to {}",
            dib.width,
            dib.height,
            dib.bit_count,
            path.as_ref().display()
        );

        Ok(())
    }

    fn resolve_rect(&self, rect: Option<Rect>) -> Result<Rect, CaptureError> {
        match rect {
            Some(rect) => Ok(rect.validate()?),
            None => self
                .stable_virtual_screen_rect()
                .map_err(|e| CaptureError::failed(Stage::Geometry, e)),
        }
    }
}
