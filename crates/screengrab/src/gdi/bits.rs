use core::{ffi::c_void, mem::size_of};

use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAP, BITMAPINFO, BITMAPINFOHEADER, DIB_RGB_COLORS, GetBitmapBits, GetDIBits,
    GetObjectW, RGBQUAD,
};

use crate::{
    LabelledNativeResult, NativeBitmapInfo, NativeDib, NativeError, extract::dib_row_stride,
};

use super::{GdiBitmap, GdiDevice, last_error};

/// A `BITMAPINFO` with room for the largest colour table.
#[repr(C)]
struct PalettedBitmapInfo {
    header: BITMAPINFOHEADER,
    colors: [RGBQUAD; 256],
}

impl PalettedBitmapInfo {
    fn new(width: u32, height: u32, bit_count: u16) -> LabelledNativeResult<Self> {
        let (Ok(width), Ok(height)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(NativeError::from_message(
                format!("{width}x{height} does not fit a DIB"),
                "GetDIBits",
            ));
        };

        Ok(Self {
            header: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Positive height requests bottom-up rows.
                biHeight: height,
                biPlanes: 1,
                biBitCount: bit_count,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            colors: [RGBQUAD::default(); 256],
        })
    }
}

pub(super) fn bitmap_info(bitmap: &GdiBitmap) -> LabelledNativeResult<NativeBitmapInfo> {
    let mut raw = BITMAP::default();

    let written = unsafe {
        GetObjectW(
            bitmap.bitmap.into(),
            size_of::<BITMAP>() as i32,
            Some((&mut raw as *mut BITMAP).cast()),
        )
    };
    if written == 0 {
        return Err(last_error("GetObjectW"));
    }

    let (Ok(width), Ok(height), Ok(width_bytes)) = (
        u32::try_from(raw.bmWidth),
        u32::try_from(raw.bmHeight),
        u32::try_from(raw.bmWidthBytes),
    ) else {
        return Err(NativeError::from_message(
            format!(
                "bitmap reported a negative size {}x{} with {} bytes per row",
                raw.bmWidth, raw.bmHeight, raw.bmWidthBytes
            ),
            "GetObjectW",
        ));
    };

    Ok(NativeBitmapInfo {
        width,
        height,
        bits_per_pixel: raw.bmBitsPixel,
        width_bytes,
    })
}

pub(super) fn bitmap_bits(
    bitmap: &GdiBitmap,
    info: &NativeBitmapInfo,
) -> LabelledNativeResult<Vec<u8>> {
    let length = info.width_bytes as usize * info.height as usize;
    let Ok(count) = i32::try_from(length) else {
        return Err(NativeError::from_message(
            format!("{length} bytes is too large to copy"),
            "GetBitmapBits",
        ));
    };

    let mut bits = vec![0u8; length];
    let copied = unsafe { GetBitmapBits(bitmap.bitmap, count, bits.as_mut_ptr().cast::<c_void>()) };
    if copied == 0 {
        return Err(last_error("GetBitmapBits"));
    }

    // A short copy is left for the extractor to report as a byte count mismatch.
    bits.truncate(copied.unsigned_abs() as usize);

    Ok(bits)
}

pub(super) fn dib_bits(
    device: &GdiDevice,
    bitmap: &GdiBitmap,
    info: &NativeBitmapInfo,
) -> LabelledNativeResult<Vec<u8>> {
    let mut dib = PalettedBitmapInfo::new(info.width, info.height, 24)?;
    let mut bits = vec![0u8; dib_row_stride(info.width, 24) * info.height as usize];

    read_dib(device, bitmap, info.height, &mut dib, &mut bits)?;

    Ok(bits)
}

pub(super) fn native_dib(
    device: &GdiDevice,
    bitmap: &GdiBitmap,
    info: &NativeBitmapInfo,
) -> LabelledNativeResult<NativeDib> {
    let bit_count = info.bits_per_pixel;
    let mut dib = PalettedBitmapInfo::new(info.width, info.height, bit_count)?;
    let mut bits = vec![0u8; dib_row_stride(info.width, bit_count) * info.height as usize];

    read_dib(device, bitmap, info.height, &mut dib, &mut bits)?;

    let palette = if bit_count <= 8 {
        let used = match dib.header.biClrUsed {
            0 => 1usize << bit_count,
            used => (used as usize).min(256),
        };

        dib.colors[..used]
            .iter()
            .map(|color| [color.rgbBlue, color.rgbGreen, color.rgbRed, color.rgbReserved])
            .collect()
    } else {
        Vec::new()
    };

    Ok(NativeDib {
        width: info.width,
        height: info.height,
        bit_count,
        palette,
        bits,
    })
}

fn read_dib(
    device: &GdiDevice,
    bitmap: &GdiBitmap,
    height: u32,
    dib: &mut PalettedBitmapInfo,
    bits: &mut [u8],
) -> LabelledNativeResult<()> {
    let lines = unsafe {
        GetDIBits(
            device.memory_dc,
            bitmap.bitmap,
            0,
            height,
            Some(bits.as_mut_ptr().cast::<c_void>()),
            (dib as *mut PalettedBitmapInfo).cast::<BITMAPINFO>(),
            DIB_RGB_COLORS,
        )
    };

    if lines == 0 {
        return Err(last_error("GetDIBits"));
    }

    if lines.unsigned_abs() != height {
        return Err(NativeError::from_message(
            format!("copied {lines} of {height} scan lines"),
            "GetDIBits",
        ));
    }

    Ok(())
}
