use core::fmt;

use thiserror::Error;

use crate::{
    BmpError, CropError, DisplaysOutsideCapture, GeometryUnavailable, InvalidRect, NativeError,
    PixelExtractionFailed,
};

/// The step of a capture that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading stable display geometry.
    Geometry,

    /// Acquiring the desktop drawing surface.
    Device,

    /// Allocating the off-screen bitmap.
    Allocate,

    /// Copying pixels from the desktop.
    Blit,

    /// Reading the copied pixels.
    Extract,

    /// Cropping displays out of the virtual screen capture.
    Composite,
}

impl Stage {
    /// Common operator states that cause this stage to fail.
    pub fn likely_causes(&self) -> Option<&'static str> {
        match self {
            Self::Allocate => Some("the region may be too large to allocate"),
            Self::Blit => Some(
                "possible reasons are a locked workstation, no active display session, or an active elevation prompt",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Geometry => "geometry",
            Self::Device => "device",
            Self::Allocate => "allocate",
            Self::Blit => "blit",
            Self::Extract => "extract",
            Self::Composite => "composite",
        };

        f.write_str(name)
    }
}

fn causes_suffix(stage: &Stage) -> String {
    stage
        .likely_causes()
        .map(|causes| format!(", {causes}"))
        .unwrap_or_default()
}

/// What went wrong inside a failed stage.
#[derive(Debug, Error)]
pub enum FailureSource {
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Extraction(#[from] PixelExtractionFailed),

    #[error(transparent)]
    Geometry(#[from] GeometryUnavailable),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Reconfigured(#[from] DisplaysOutsideCapture),
}

/// A capture that did not produce a buffer.
///
/// No native resources outlive the failed call and later captures are unaffected.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid capture rect:\n{0}")]
    InvalidRect(#[from] InvalidRect),

    #[error("Capture failed at the {stage} stage{}:\n{source}", causes_suffix(.stage))]
    CaptureFailed {
        stage: Stage,
        #[source]
        source: FailureSource,
    },
}

impl CaptureError {
    pub(crate) fn failed<S: Into<FailureSource>>(stage: Stage, source: S) -> Self {
        Self::CaptureFailed {
            stage,
            source: source.into(),
        }
    }

    /// The failed stage, `None` for an invalid rect.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InvalidRect(_) => None,
            Self::CaptureFailed { stage, .. } => Some(*stage),
        }
    }
}

/// A capture could not be saved as a bitmap file.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to take the capture:\n{0}")]
    Capture(#[from] CaptureError),

    #[error("Failed to write the bitmap file:\n{0}")]
    Write(#[from] BmpError),
}
