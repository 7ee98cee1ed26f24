//! Tests against the live desktop
//!

#![cfg(windows)]

use screengrab::{Rect, ScreenGrab, Stage};
use test_helper::{gdi_objects::gdi_object_count, logger::init_logger};

#[test]
fn stable_geometry() {
    init_logger();

    let grab = ScreenGrab::new();

    let first = grab.stable_virtual_screen_rect().unwrap();
    let second = grab.stable_virtual_screen_rect().unwrap();
    assert_eq!(first, second);

    let displays = grab.stable_display_rects().unwrap();
    assert!(!displays.is_empty());
    for display in displays {
        assert!(first.contains_rect(&display), "{display} outside {first}");
    }
}

#[test]
fn capture_rect() {
    init_logger();

    let grab = ScreenGrab::new();
    let buffer = grab.capture(Some(Rect::new(0, 0, 256, 256).unwrap())).unwrap();

    assert_eq!(buffer.size(), [256, 256]);
    assert!(buffer.row_stride() >= 768);
}

#[test]
fn capture_all_displays() {
    init_logger();

    let grab = ScreenGrab::new();
    let displays = grab.stable_display_rects().unwrap();
    let buffers = grab.capture_all_displays().unwrap();

    assert_eq!(buffers.len(), displays.len());
    for (buffer, display) in buffers.iter().zip(&displays) {
        assert_eq!(buffer.size(), display.size());
    }
}

#[test]
fn oversized_rect_fails_to_allocate() {
    init_logger();

    let grab = ScreenGrab::new();
    let error = grab
        .capture(Some(Rect::new(0, 0, 2_600_000, 2_600_000).unwrap()))
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Allocate));
}

#[test]
fn no_gdi_objects_leak() {
    init_logger();

    let grab = ScreenGrab::new();
    let rect = Rect::new(0, 0, 1, 1).unwrap();

    // Warm up so lazily created objects are not counted.
    grab.capture(Some(rect)).unwrap();
    let before = gdi_object_count();

    for _ in 0..10_000 {
        grab.capture(Some(rect)).unwrap();
    }

    assert_eq!(gdi_object_count(), before);
}
