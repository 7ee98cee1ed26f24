//! A scripted desktop standing in for the OS.
//!
//! Screen content is a seeded random tile repeated across the virtual desktop, areas not covered
//! by a display read back as black. Every native handle is tracked so tests can check that
//! nothing leaks and that releases happen in reverse acquisition order.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use screengrab::{
    CaptureBackend, GeometrySource, LabelledNativeResult, NativeBitmapInfo, NativeDib,
    NativeError, Rect, dib_row_stride,
};

const TILE_WIDTH: i32 = 97;
const TILE_HEIGHT: i32 = 89;

/// Win32 `ERROR_NOT_ENOUGH_MEMORY`.
const NOT_ENOUGH_MEMORY: u32 = 8;

/// Bitmaps above this many pixels fail to allocate unless configured otherwise.
pub const DEFAULT_MAX_BITMAP_PIXELS: u64 = 1 << 28;

/// A backend call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    AcquireDevice,
    AllocateBitmap,
    Blit,
    BitmapInfo,
    BitmapBits,
    DibBits,
    NativeDib,
}

/// A handle operation observed by the desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DeviceAcquired(u32),
    DeviceReleased(u32),
    BitmapAllocated(u32),
    BitmapReleased(u32),
    Blit(Rect),
}

#[derive(Debug)]
pub struct SimulatedDevice {
    id: u32,
}

#[derive(Debug)]
pub struct SimulatedBitmap {
    id: u32,
    width: u32,
    height: u32,
    pixels: RefCell<Vec<[u8; 3]>>,
}

pub struct SimulatedDesktop {
    displays: RefCell<Vec<Rect>>,
    tile: Vec<[u8; 3]>,
    bits_per_pixel: u16,
    max_bitmap_pixels: u64,

    virtual_screen_reads: RefCell<VecDeque<Option<Rect>>>,
    display_reads: RefCell<VecDeque<Option<Vec<Rect>>>>,
    fail_point: Cell<Option<FailPoint>>,
    short_reads: Cell<bool>,

    next_id: Cell<u32>,
    live_devices: RefCell<Vec<u32>>,
    live_bitmaps: RefCell<Vec<u32>>,
    events: RefCell<Vec<Event>>,
    native_calls: Cell<usize>,
    geometry_reads: Cell<usize>,
}

impl SimulatedDesktop {
    /// A desktop made of `displays` with random content.
    pub fn new(displays: Vec<Rect>) -> Self {
        Self::with_seed(displays, rand::random())
    }

    /// A desktop made of `displays` whose content is generated from `seed`.
    pub fn with_seed(displays: Vec<Rect>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let tile = (0..TILE_WIDTH * TILE_HEIGHT)
            .map(|_| rng.random::<[u8; 3]>())
            .collect();

        Self {
            displays: RefCell::new(displays),
            tile,
            bits_per_pixel: 32,
            max_bitmap_pixels: DEFAULT_MAX_BITMAP_PIXELS,
            virtual_screen_reads: RefCell::default(),
            display_reads: RefCell::default(),
            fail_point: Cell::new(None),
            short_reads: Cell::new(false),
            next_id: Cell::new(1),
            live_devices: RefCell::default(),
            live_bitmaps: RefCell::default(),
            events: RefCell::default(),
            native_calls: Cell::new(0),
            geometry_reads: Cell::new(0),
        }
    }

    /// A desktop with a single primary display.
    pub fn single_display(width: i32, height: i32) -> Self {
        Self::new(vec![Rect {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }])
    }

    /// Sets the colour depth of captured bitmaps, one of 8, 16, 24, 32.
    pub fn with_bits_per_pixel(mut self, bits_per_pixel: u16) -> Self {
        assert!(
            matches!(bits_per_pixel, 8 | 16 | 24 | 32),
            "unsupported colour depth {bits_per_pixel}"
        );
        self.bits_per_pixel = bits_per_pixel;
        self
    }

    /// Sets the largest bitmap that can be allocated.
    pub fn with_max_bitmap_pixels(mut self, max_bitmap_pixels: u64) -> Self {
        self.max_bitmap_pixels = max_bitmap_pixels;
        self
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub fn displays(&self) -> Vec<Rect> {
        self.displays.borrow().clone()
    }

    /// Reconfigures the displays, unscripted reads see the change immediately.
    pub fn set_displays(&self, displays: Vec<Rect>) {
        *self.displays.borrow_mut() = displays;
    }

    /// The bounding box of the displays.
    pub fn virtual_screen(&self) -> Rect {
        let displays = self.displays.borrow();
        let Some(first) = displays.first() else {
            return Rect {
                left: 0,
                top: 0,
                right: 0,
                bottom: 0,
            };
        };

        displays.iter().fold(*first, |bounds, rect| Rect {
            left: bounds.left.min(rect.left),
            top: bounds.top.min(rect.top),
            right: bounds.right.max(rect.right),
            bottom: bounds.bottom.max(rect.bottom),
        })
    }

    /// Queues raw virtual screen reads, `None` is a failed read.
    ///
    /// Once the queue is drained reads report the current configuration.
    pub fn push_virtual_screen_reads<I: IntoIterator<Item = Option<Rect>>>(&self, reads: I) {
        self.virtual_screen_reads.borrow_mut().extend(reads);
    }

    /// Queues raw display reads, `None` is a failed read.
    ///
    /// Once the queue is drained reads report the current configuration.
    pub fn push_display_reads<I: IntoIterator<Item = Option<Vec<Rect>>>>(&self, reads: I) {
        self.display_reads.borrow_mut().extend(reads);
    }

    /// Makes every call at `point` fail until cleared with `None`.
    pub fn set_fail_point(&self, point: Option<FailPoint>) {
        self.fail_point.set(point);
    }

    /// Makes bit reads return 4 bytes fewer than requested.
    pub fn set_short_reads(&self, short_reads: bool) {
        self.short_reads.set(short_reads);
    }

    pub fn live_devices(&self) -> usize {
        self.live_devices.borrow().len()
    }

    pub fn live_bitmaps(&self) -> usize {
        self.live_bitmaps.borrow().len()
    }

    /// Devices and bitmaps that have not been released.
    pub fn live_handles(&self) -> usize {
        self.live_devices() + self.live_bitmaps()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// The number of capture backend calls made.
    pub fn native_calls(&self) -> usize {
        self.native_calls.get()
    }

    /// The number of raw geometry reads made.
    pub fn geometry_reads(&self) -> usize {
        self.geometry_reads.get()
    }

    /// The pixel shown at a virtual desktop coordinate.
    pub fn pixel_at(&self, x: i32, y: i32) -> [u8; 3] {
        let on_display = self
            .displays
            .borrow()
            .iter()
            .any(|rect| x >= rect.left && x < rect.right && y >= rect.top && y < rect.bottom);
        if !on_display {
            return [0, 0, 0];
        }

        let column = x.rem_euclid(TILE_WIDTH);
        let row = y.rem_euclid(TILE_HEIGHT);
        self.tile[(row * TILE_WIDTH + column) as usize]
    }

    /// The top-down RGB24 bytes a capture of `rect` should produce.
    pub fn expected_rgb(&self, rect: Rect) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(rect.width() as usize * rect.height() as usize * 3);
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                bytes.extend_from_slice(&self.pixel_at(x, y));
            }
        }
        bytes
    }

    fn call(&self, point: FailPoint, call: &'static str) -> LabelledNativeResult<()> {
        self.native_calls.set(self.native_calls.get() + 1);

        if self.fail_point.get() == Some(point) {
            return Err(NativeError::from_message("simulated failure", call));
        }

        Ok(())
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn assert_device_live(&self, device: &SimulatedDevice) {
        assert!(
            self.live_devices.borrow().contains(&device.id),
            "device {} used after release",
            device.id
        );
    }

    fn shorten(&self, mut bits: Vec<u8>) -> Vec<u8> {
        if self.short_reads.get() {
            bits.truncate(bits.len().saturating_sub(4));
        }
        bits
    }

    /// Bottom-up rows of `bit_count` bits per pixel, each padded to 4 bytes.
    fn dib_rows(
        &self,
        bitmap: &SimulatedBitmap,
        bit_count: u16,
        write_pixel: impl Fn(&[u8; 3], &mut Vec<u8>),
    ) -> Vec<u8> {
        let stride = dib_row_stride(bitmap.width, bit_count);
        let pixels = bitmap.pixels.borrow();
        let mut bits = Vec::with_capacity(stride * bitmap.height as usize);

        for row in pixels.chunks_exact(bitmap.width as usize).rev() {
            let start = bits.len();
            for pixel in row {
                write_pixel(pixel, &mut bits);
            }
            bits.resize(start + stride, 0);
        }

        bits
    }
}

impl GeometrySource for SimulatedDesktop {
    fn virtual_screen_rect(&self) -> LabelledNativeResult<Rect> {
        self.geometry_reads.set(self.geometry_reads.get() + 1);

        match self.virtual_screen_reads.borrow_mut().pop_front() {
            Some(Some(rect)) => Ok(rect),
            Some(None) => Err(NativeError::from_message(
                "simulated geometry failure",
                "GetSystemMetrics",
            )),
            None => Ok(self.virtual_screen()),
        }
    }

    fn display_rects(&self) -> LabelledNativeResult<Vec<Rect>> {
        self.geometry_reads.set(self.geometry_reads.get() + 1);

        match self.display_reads.borrow_mut().pop_front() {
            Some(Some(rects)) => Ok(rects),
            Some(None) => Err(NativeError::from_message(
                "simulated geometry failure",
                "EnumDisplayMonitors",
            )),
            None => Ok(self.displays()),
        }
    }
}

impl CaptureBackend for SimulatedDesktop {
    type Device = SimulatedDevice;
    type Bitmap = SimulatedBitmap;

    fn acquire_device(&self) -> LabelledNativeResult<SimulatedDevice> {
        self.call(FailPoint::AcquireDevice, "GetWindowDC")?;

        let id = self.next_id();
        self.live_devices.borrow_mut().push(id);
        self.events.borrow_mut().push(Event::DeviceAcquired(id));

        Ok(SimulatedDevice { id })
    }

    fn release_device(&self, device: &SimulatedDevice) {
        self.native_calls.set(self.native_calls.get() + 1);

        let mut live = self.live_devices.borrow_mut();
        let Some(index) = live.iter().position(|id| *id == device.id) else {
            panic!("device {} released twice", device.id);
        };
        live.remove(index);
        self.events.borrow_mut().push(Event::DeviceReleased(device.id));
    }

    fn allocate_bitmap(
        &self,
        device: &SimulatedDevice,
        width: u32,
        height: u32,
    ) -> LabelledNativeResult<SimulatedBitmap> {
        self.call(FailPoint::AllocateBitmap, "CreateCompatibleBitmap")?;
        self.assert_device_live(device);

        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_bitmap_pixels {
            return Err(NativeError::from_win32(
                NOT_ENOUGH_MEMORY,
                "CreateCompatibleBitmap",
            ));
        }

        let id = self.next_id();
        self.live_bitmaps.borrow_mut().push(id);
        self.events.borrow_mut().push(Event::BitmapAllocated(id));

        Ok(SimulatedBitmap {
            id,
            width,
            height,
            pixels: RefCell::new(vec![[0; 3]; pixels as usize]),
        })
    }

    fn release_bitmap(&self, device: &SimulatedDevice, bitmap: &SimulatedBitmap) {
        self.native_calls.set(self.native_calls.get() + 1);
        self.assert_device_live(device);

        let mut live = self.live_bitmaps.borrow_mut();
        let Some(index) = live.iter().position(|id| *id == bitmap.id) else {
            panic!("bitmap {} released twice", bitmap.id);
        };
        live.remove(index);
        self.events.borrow_mut().push(Event::BitmapReleased(bitmap.id));
    }

    fn blit(
        &self,
        device: &SimulatedDevice,
        bitmap: &SimulatedBitmap,
        source: Rect,
    ) -> LabelledNativeResult<()> {
        self.call(FailPoint::Blit, "BitBlt")?;
        self.assert_device_live(device);
        self.events.borrow_mut().push(Event::Blit(source));

        let mut pixels = bitmap.pixels.borrow_mut();
        for y in 0..bitmap.height {
            for x in 0..bitmap.width {
                let pixel = self.pixel_at(
                    source.left.saturating_add(x as i32),
                    source.top.saturating_add(y as i32),
                );
                pixels[(y * bitmap.width + x) as usize] = pixel;
            }
        }

        Ok(())
    }

    fn bitmap_info(&self, bitmap: &SimulatedBitmap) -> LabelledNativeResult<NativeBitmapInfo> {
        self.call(FailPoint::BitmapInfo, "GetObjectW")?;

        // Device dependent bitmaps pad rows to 2 bytes.
        let width_bytes = match self.bits_per_pixel {
            32 => bitmap.width * 4,
            24 => (bitmap.width * 3).next_multiple_of(2),
            16 => bitmap.width * 2,
            _ => bitmap.width.next_multiple_of(2),
        };

        Ok(NativeBitmapInfo {
            width: bitmap.width,
            height: bitmap.height,
            bits_per_pixel: self.bits_per_pixel,
            width_bytes,
        })
    }

    fn bitmap_bits(
        &self,
        bitmap: &SimulatedBitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>> {
        self.call(FailPoint::BitmapBits, "GetBitmapBits")?;

        let bits = if info.bits_per_pixel == 32 {
            bitmap
                .pixels
                .borrow()
                .iter()
                .flat_map(|[r, g, b]| [*b, *g, *r, 0])
                .collect()
        } else {
            // Device formats below 32 bits are not RGB, reading them directly is meaningless.
            vec![0xCD; info.width_bytes as usize * info.height as usize]
        };

        Ok(self.shorten(bits))
    }

    fn dib_bits(
        &self,
        device: &SimulatedDevice,
        bitmap: &SimulatedBitmap,
        _info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<Vec<u8>> {
        self.call(FailPoint::DibBits, "GetDIBits")?;
        self.assert_device_live(device);

        let bits = self.dib_rows(bitmap, 24, |[r, g, b], bits| {
            bits.extend_from_slice(&[*b, *g, *r])
        });

        Ok(self.shorten(bits))
    }

    fn native_dib(
        &self,
        device: &SimulatedDevice,
        bitmap: &SimulatedBitmap,
        info: &NativeBitmapInfo,
    ) -> LabelledNativeResult<NativeDib> {
        self.call(FailPoint::NativeDib, "GetDIBits")?;
        self.assert_device_live(device);

        let bit_count = info.bits_per_pixel;
        let (palette, bits) = match bit_count {
            32 => (
                Vec::new(),
                self.dib_rows(bitmap, 32, |[r, g, b], bits| {
                    bits.extend_from_slice(&[*b, *g, *r, 0])
                }),
            ),
            24 => (
                Vec::new(),
                self.dib_rows(bitmap, 24, |[r, g, b], bits| {
                    bits.extend_from_slice(&[*b, *g, *r])
                }),
            ),
            16 => (
                Vec::new(),
                self.dib_rows(bitmap, 16, |[r, g, b], bits| {
                    let value = (u16::from(*r >> 3) << 10) | (u16::from(*g >> 3) << 5) | u16::from(*b >> 3);
                    bits.extend_from_slice(&value.to_le_bytes())
                }),
            ),
            _ => (
                (0..=255u8).map(|level| [level, level, level, 0]).collect(),
                self.dib_rows(bitmap, 8, |[r, g, b], bits| {
                    let level = (u16::from(*r) + u16::from(*g) + u16::from(*b)) / 3;
                    bits.push(level as u8)
                }),
            ),
        };

        Ok(NativeDib {
            width: bitmap.width,
            height: bitmap.height,
            bit_count,
            palette,
            bits,
        })
    }
}
