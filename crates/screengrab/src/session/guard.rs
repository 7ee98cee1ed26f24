use crate::{CaptureBackend, LabelledNativeResult};

/// Owns an acquired device, releases it on drop.
pub(crate) struct DeviceGuard<'a, B: CaptureBackend + ?Sized> {
    backend: &'a B,
    device: B::Device,
}

impl<'a, B: CaptureBackend + ?Sized> DeviceGuard<'a, B> {
    pub fn acquire(backend: &'a B) -> LabelledNativeResult<Self> {
        let device = backend.acquire_device()?;

        Ok(Self { backend, device })
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: CaptureBackend + ?Sized> Drop for DeviceGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.release_device(&self.device);
    }
}

/// Owns a bitmap allocated on a device, releases it on drop.
///
/// Borrows its device guard, so the bitmap is always released before the device.
pub(crate) struct BitmapGuard<'a, B: CaptureBackend + ?Sized> {
    device: &'a DeviceGuard<'a, B>,
    bitmap: B::Bitmap,
}

impl<'a, B: CaptureBackend + ?Sized> BitmapGuard<'a, B> {
    pub fn allocate(
        device: &'a DeviceGuard<'a, B>,
        width: u32,
        height: u32,
    ) -> LabelledNativeResult<Self> {
        let bitmap = device
            .backend
            .allocate_bitmap(device.device(), width, height)?;

        Ok(Self { device, bitmap })
    }

    pub fn bitmap(&self) -> &B::Bitmap {
        &self.bitmap
    }
}

impl<B: CaptureBackend + ?Sized> Drop for BitmapGuard<'_, B> {
    fn drop(&mut self) {
        self.device
            .backend
            .release_bitmap(self.device.device(), &self.bitmap);
    }
}
