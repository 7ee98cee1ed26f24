mod guard;

use guard::{BitmapGuard, DeviceGuard};
use tracing::{Level, debug, error, instrument, trace};

use crate::{
    CaptureBackend, CaptureBuffer, CaptureError, FailureSource, InvalidRect, NativeDib,
    PixelExtractor, Rect, Stage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    DeviceAcquired,
    BitmapAllocated,
    Blitted,
    Extracted,
    Released,
    Failed,
}

impl SessionState {
    /// The stage that moves the session out of this state.
    fn next_stage(self) -> Stage {
        match self {
            Self::Idle => Stage::Device,
            Self::DeviceAcquired => Stage::Allocate,
            Self::BitmapAllocated => Stage::Blit,
            Self::Blitted | Self::Extracted | Self::Released | Self::Failed => Stage::Extract,
        }
    }
}

/// A single capture of one region of the desktop.
///
/// The device and bitmap are owned by guards for the duration of the capture, both are released
/// in reverse acquisition order before the capture returns, whether it succeeded or not.
pub struct CaptureSession<'a, B: ?Sized> {
    backend: &'a B,
    rect: Rect,
    state: SessionState,
}

impl<'a, B: CaptureBackend + ?Sized> CaptureSession<'a, B> {
    /// Creates a session for `rect`, no native resources are touched until the capture runs.
    pub fn new(backend: &'a B, rect: Rect) -> Result<Self, InvalidRect> {
        Ok(Self {
            backend,
            rect: rect.validate()?,
            state: SessionState::Idle,
        })
    }

    /// The region this session captures.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Captures the region as top-down RGB24.
    #[instrument("CaptureSession::capture", level = Level::DEBUG, skip(self), fields(rect = %self.rect), err)]
    pub fn capture(self) -> Result<CaptureBuffer, CaptureError> {
        self.run(|backend, device, bitmap| {
            let buffer = PixelExtractor::new(backend).extract(device, bitmap)?;
            Ok(buffer)
        })
    }

    /// Captures the region at the display's bit depth without normalizing it.
    #[instrument("CaptureSession::capture_native", level = Level::DEBUG, skip(self), fields(rect = %self.rect), err)]
    pub fn capture_native(self) -> Result<NativeDib, CaptureError> {
        self.run(|backend, device, bitmap| {
            let info = backend.bitmap_info(bitmap)?;
            let dib = backend.native_dib(device, bitmap, &info)?;
            Ok(dib)
        })
    }

    fn run<T>(
        mut self,
        read: impl FnOnce(&B, &B::Device, &B::Bitmap) -> Result<T, FailureSource>,
    ) -> Result<T, CaptureError> {
        let backend = self.backend;
        let [width, height] = self.rect.size();

        let device = DeviceGuard::acquire(backend).map_err(|e| self.fail(e))?;
        self.advance(SessionState::DeviceAcquired);

        let bitmap = BitmapGuard::allocate(&device, width, height).map_err(|e| self.fail(e))?;
        self.advance(SessionState::BitmapAllocated);

        backend
            .blit(device.device(), bitmap.bitmap(), self.rect)
            .map_err(|e| self.fail(e))?;
        self.advance(SessionState::Blitted);

        let output = read(backend, device.device(), bitmap.bitmap()).map_err(|e| self.fail(e))?;
        self.advance(SessionState::Extracted);

        drop(bitmap);
        drop(device);
        self.advance(SessionState::Released);

        Ok(output)
    }

    fn advance(&mut self, next: SessionState) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail<S: Into<FailureSource>>(&mut self, source: S) -> CaptureError {
        let stage = self.state.next_stage();
        let source = source.into();

        match stage {
            Stage::Device => error!("Could not acquire the desktop device context:\n{source}"),
            _ => debug!("Capture of {} failed at the {stage} stage", self.rect),
        }

        self.state = SessionState::Failed;
        CaptureError::failed(stage, source)
    }
}
