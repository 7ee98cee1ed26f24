use tracing::error;
use windows::Win32::{
    Foundation::HWND,
    Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetWindowDC,
        HBITMAP, HDC, HGDI_ERROR, HGDIOBJ, ReleaseDC, SRCCOPY, SelectObject,
    },
    UI::WindowsAndMessaging::GetDesktopWindow,
};

use crate::{LabelledNativeResult, NativeError, Rect};

use super::last_error;

/// The desktop window's device context and a memory device context compatible with it.
#[derive(Debug)]
pub struct GdiDevice {
    window: HWND,
    pub(super) screen_dc: HDC,
    pub(super) memory_dc: HDC,
}

impl GdiDevice {
    pub(super) fn acquire() -> LabelledNativeResult<Self> {
        let window = unsafe { GetDesktopWindow() };

        // The window DC of the desktop window spans the whole virtual screen.
        let screen_dc = unsafe { GetWindowDC(Some(window)) };
        if screen_dc.0.is_null() {
            return Err(last_error("GetWindowDC"));
        }

        let memory_dc = unsafe { CreateCompatibleDC(Some(screen_dc)) };
        if memory_dc.0.is_null() {
            let error = last_error("CreateCompatibleDC");
            if unsafe { ReleaseDC(Some(window), screen_dc) } == 0 {
                error!("Failed to release the desktop device context");
            }
            return Err(error);
        }

        Ok(Self {
            window,
            screen_dc,
            memory_dc,
        })
    }

    pub(super) fn release(&self) {
        if !unsafe { DeleteDC(self.memory_dc) }.as_bool() {
            error!("Failed to delete memory device context:\n{}", last_error("DeleteDC"));
        }

        if unsafe { ReleaseDC(Some(self.window), self.screen_dc) } == 0 {
            error!("Failed to release the desktop device context");
        }
    }
}

/// A bitmap compatible with the desktop, selected into a device's memory device context.
#[derive(Debug)]
pub struct GdiBitmap {
    pub(super) bitmap: HBITMAP,
    previous: HGDIOBJ,
    width: i32,
    height: i32,
}

impl GdiBitmap {
    pub(super) fn allocate(device: &GdiDevice, width: u32, height: u32) -> LabelledNativeResult<Self> {
        let (Ok(width), Ok(height)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(NativeError::from_message(
                format!("{width}x{height} does not fit a bitmap"),
                "CreateCompatibleBitmap",
            ));
        };

        let bitmap = unsafe { CreateCompatibleBitmap(device.screen_dc, width, height) };
        if bitmap.0.is_null() {
            return Err(last_error("CreateCompatibleBitmap"));
        }

        let previous = unsafe { SelectObject(device.memory_dc, bitmap.into()) };
        if previous.0.is_null() || previous == HGDI_ERROR {
            let error = last_error("SelectObject");
            if !unsafe { DeleteObject(bitmap.into()) }.as_bool() {
                error!("Failed to delete bitmap:\n{}", last_error("DeleteObject"));
            }
            return Err(error);
        }

        Ok(Self {
            bitmap,
            previous,
            width,
            height,
        })
    }

    pub(super) fn release(&self, device: &GdiDevice) {
        // A bitmap cannot be deleted while it is selected into a device context.
        unsafe { SelectObject(device.memory_dc, self.previous) };

        if !unsafe { DeleteObject(self.bitmap.into()) }.as_bool() {
            error!("Failed to delete bitmap:\n{}", last_error("DeleteObject"));
        }
    }

    pub(super) fn blit(&self, device: &GdiDevice, source: Rect) -> LabelledNativeResult<()> {
        unsafe {
            BitBlt(
                device.memory_dc,
                0,
                0,
                self.width,
                self.height,
                Some(device.screen_dc),
                source.left,
                source.top,
                SRCCOPY,
            )
        }
        .map_err(|e| NativeError::new(e, "BitBlt"))
    }
}
