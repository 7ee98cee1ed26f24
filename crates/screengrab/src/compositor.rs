use thiserror::Error;
use tracing::{Level, debug, instrument};

use crate::{
    CaptureBackend, CaptureBuffer, CaptureError, CaptureSession, Config, GeometrySource,
    GeometryStabilizer, Rect, Stage, normalize_rects,
};

/// Captures every display in one synchronized shot.
///
/// The whole virtual screen is captured once and each display is cropped out of it, so all
/// displays show the same moment.
pub struct DisplayCompositor<'a, P: ?Sized> {
    platform: &'a P,
    config: Config,
}

impl<'a, P> DisplayCompositor<'a, P>
where
    P: GeometrySource + CaptureBackend + ?Sized,
{
    /// Creates a compositor capturing through `platform`.
    pub fn new(platform: &'a P, config: Config) -> Self {
        Self { platform, config }
    }

    /// Returns one buffer per display, ordered like the stable display rects.
    ///
    /// The display rects must exactly span the virtual screen, otherwise the configuration
    /// changed between the two reads and the capture fails at the composite stage.
    #[instrument("DisplayCompositor::capture_all_displays", level = Level::DEBUG, skip_all, err)]
    pub fn capture_all_displays(&self) -> Result<Vec<CaptureBuffer>, CaptureError> {
        let stabilizer = GeometryStabilizer::new(self.platform, &self.config);

        let display_rects = stabilizer
            .stable_display_rects()
            .map_err(|e| CaptureError::failed(Stage::Geometry, e))?;
        let virtual_screen = stabilizer
            .stable_virtual_screen_rect()
            .map_err(|e| CaptureError::failed(Stage::Geometry, e))?;

        if Rect::bounding(&display_rects) != Some(virtual_screen) {
            return Err(CaptureError::failed(
                Stage::Composite,
                DisplaysOutsideCapture {
                    displays: display_rects,
                    virtual_screen,
                },
            ));
        }

        let screen = CaptureSession::new(self.platform, virtual_screen)?.capture()?;

        // The displays span the virtual screen, so their normalized origin is the buffer's.
        let crops = normalize_rects(&display_rects);
        debug!(
            "Cropping {} displays out of a {}x{} capture",
            crops.len(),
            screen.width(),
            screen.height()
        );

        crops
            .into_iter()
            .map(|rect| {
                screen
                    .crop(rect)
                    .map_err(|e| CaptureError::failed(Stage::Composite, e))
            })
            .collect()
    }
}

/// The display rects and the virtual screen rect were read from different configurations.
#[derive(Debug, Error)]
#[error("Displays {displays:?} do not span the virtual screen {virtual_screen}")]
pub struct DisplaysOutsideCapture {
    /// The stable display rects.
    pub displays: Vec<Rect>,

    /// The stable virtual screen rect.
    pub virtual_screen: Rect,
}
