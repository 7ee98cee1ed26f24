use windows::Win32::{
    Foundation::{LPARAM, RECT},
    Graphics::Gdi::{EnumDisplayMonitors, HDC, HMONITOR},
    UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    },
};
use windows_core::BOOL;

use crate::{GeometrySource, LabelledNativeResult, NativeError, Rect};

use super::{Gdi, last_error};

impl GeometrySource for Gdi {
    fn virtual_screen_rect(&self) -> LabelledNativeResult<Rect> {
        let (x, y, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };

        let (Some(right), Some(bottom)) = (x.checked_add(width), y.checked_add(height)) else {
            return Err(NativeError::from_message(
                format!("virtual screen {width}x{height} at ({x}, {y}) overflows"),
                "GetSystemMetrics",
            ));
        };

        Ok(Rect {
            left: x,
            top: y,
            right,
            bottom,
        })
    }

    fn display_rects(&self) -> LabelledNativeResult<Vec<Rect>> {
        let mut rects: Vec<Rect> = Vec::new();

        let succeeded = unsafe {
            EnumDisplayMonitors(
                None,
                None,
                Some(enum_monitor),
                LPARAM(&mut rects as *mut Vec<Rect> as isize),
            )
        };
        if !succeeded.as_bool() {
            return Err(last_error("EnumDisplayMonitors"));
        }

        Ok(rects)
    }
}

// The LPARAM is a pointer to the list being populated.
unsafe extern "system" fn enum_monitor(
    _monitor: HMONITOR,
    _dc: HDC,
    rect: *mut RECT,
    state: LPARAM,
) -> BOOL {
    let (rect, rects) = unsafe { (rect.read(), &mut *(state.0 as *mut Vec<Rect>)) };

    rects.push(Rect {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    });

    true.into()
}
