//! Tests for the CaptureSession
//!

use screengrab::{
    CaptureError, CaptureSession, Config, FailureSource, InvalidRect, Rect, ScreenGrab, Stage,
};
use test_helper::{
    logger::init_logger,
    simulated::{Event, FailPoint, SimulatedDesktop},
};

fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
    Rect {
        left,
        top,
        right,
        bottom,
    }
}

fn grab(desktop: SimulatedDesktop) -> ScreenGrab<SimulatedDesktop> {
    ScreenGrab::with_platform(desktop, Config::default())
}

#[test]
fn capture_rect() {
    init_logger();

    let grab = grab(SimulatedDesktop::single_display(1920, 1080));
    let target = rect(0, 0, 256, 256);

    let buffer = grab.capture(Some(target)).unwrap();

    assert_eq!(buffer.size(), [256, 256]);
    assert!(buffer.row_stride() >= 256 * 3);
    assert_eq!(buffer.bytes().len(), 256 * buffer.row_stride());
    assert_eq!(buffer.bytes(), grab.platform().expected_rgb(target));
}

#[test]
fn capture_size_matches_rect() {
    init_logger();

    let grab = grab(SimulatedDesktop::new(vec![
        rect(0, 0, 1920, 1080),
        rect(-1280, -200, 0, 824),
    ]));

    for target in [
        rect(0, 0, 1, 1),
        rect(-1280, -200, -1000, 100),
        rect(-50, 17, 113, 31),
        rect(1900, 1000, 1920, 1080),
    ] {
        let buffer = grab.capture(Some(target)).unwrap();

        assert_eq!(buffer.width() as i32, target.right - target.left);
        assert_eq!(buffer.height() as i32, target.bottom - target.top);
        assert_eq!(buffer.bytes(), grab.platform().expected_rgb(target));
    }
}

#[test]
fn capture_whole_virtual_screen() {
    init_logger();

    let grab = grab(SimulatedDesktop::new(vec![
        rect(0, 0, 640, 480),
        rect(640, -120, 1440, 480),
    ]));

    let buffer = grab.capture(None).unwrap();
    let virtual_screen = rect(0, -120, 1440, 480);

    assert_eq!(buffer.size(), [1440, 600]);
    assert_eq!(buffer.bytes(), grab.platform().expected_rgb(virtual_screen));

    // Not covered by any display.
    assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0]));
}

#[test]
fn degenerate_rects_touch_nothing() {
    init_logger();

    let grab = grab(SimulatedDesktop::single_display(800, 600));

    for target in [
        rect(100, 100, 100, 100),
        rect(100, 100, 99, 100),
        rect(100, 100, 100, 99),
        rect(100, 100, 101, 100),
        rect(100, 100, 101, 99),
    ] {
        let error = grab.capture(Some(target)).unwrap_err();
        assert!(matches!(error, CaptureError::InvalidRect(_)), "{error}");
        assert_eq!(error.stage(), None);

        let error = grab.capture_native(Some(target)).unwrap_err();
        assert!(matches!(error, CaptureError::InvalidRect(_)), "{error}");
    }

    assert_eq!(grab.platform().native_calls(), 0);
    assert_eq!(grab.platform().geometry_reads(), 0);
}

#[test]
fn session_rejects_degenerate_rects() {
    let desktop = SimulatedDesktop::single_display(800, 600);

    assert!(matches!(
        CaptureSession::new(&desktop, rect(5, 5, 5, 10)),
        Err(InvalidRect::NonPositiveWidth(_))
    ));
    assert_eq!(desktop.native_calls(), 0);
}

#[test]
fn releases_in_reverse_order() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    let target = rect(10, 10, 20, 20);

    CaptureSession::new(&desktop, target)
        .unwrap()
        .capture()
        .unwrap();

    assert_eq!(
        desktop.events(),
        vec![
            Event::DeviceAcquired(1),
            Event::BitmapAllocated(2),
            Event::Blit(target),
            Event::BitmapReleased(2),
            Event::DeviceReleased(1),
        ]
    );
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn device_failure() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    desktop.set_fail_point(Some(FailPoint::AcquireDevice));

    let error = CaptureSession::new(&desktop, rect(0, 0, 10, 10))
        .unwrap()
        .capture()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Device));
    assert!(desktop.events().is_empty());
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn allocate_failure_releases_the_device() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    desktop.set_fail_point(Some(FailPoint::AllocateBitmap));

    let error = CaptureSession::new(&desktop, rect(0, 0, 10, 10))
        .unwrap()
        .capture()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Allocate));
    assert_eq!(
        desktop.events(),
        vec![Event::DeviceAcquired(1), Event::DeviceReleased(1)]
    );
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn oversized_rect_fails_to_allocate() {
    init_logger();

    let grab = grab(SimulatedDesktop::single_display(800, 600));

    let error = grab
        .capture(Some(rect(0, 0, 2_600_000, 2_600_000)))
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Allocate));
    assert!(error.to_string().contains("too large"), "{error}");
    assert_eq!(grab.platform().live_handles(), 0);
}

#[test]
fn blit_failure_releases_everything() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    desktop.set_fail_point(Some(FailPoint::Blit));

    let error = CaptureSession::new(&desktop, rect(0, 0, 10, 10))
        .unwrap()
        .capture()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Blit));
    assert!(error.to_string().contains("locked workstation"), "{error}");
    assert_eq!(
        desktop.events(),
        vec![
            Event::DeviceAcquired(1),
            Event::BitmapAllocated(2),
            Event::BitmapReleased(2),
            Event::DeviceReleased(1),
        ]
    );
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn extract_failure_releases_everything() {
    init_logger();

    for point in [FailPoint::BitmapInfo, FailPoint::BitmapBits] {
        let desktop = SimulatedDesktop::single_display(800, 600);
        desktop.set_fail_point(Some(point));

        let error = CaptureSession::new(&desktop, rect(0, 0, 10, 10))
            .unwrap()
            .capture()
            .unwrap_err();

        assert_eq!(error.stage(), Some(Stage::Extract));
        assert!(matches!(
            error,
            CaptureError::CaptureFailed {
                source: FailureSource::Extraction(_),
                ..
            }
        ));
        assert_eq!(desktop.live_handles(), 0);
    }
}

#[test]
fn failures_do_not_poison_later_captures() {
    init_logger();

    let grab = grab(SimulatedDesktop::single_display(800, 600));
    let target = rect(0, 0, 32, 32);

    for point in [
        FailPoint::AcquireDevice,
        FailPoint::AllocateBitmap,
        FailPoint::Blit,
        FailPoint::BitmapBits,
    ] {
        grab.platform().set_fail_point(Some(point));
        assert!(grab.capture(Some(target)).is_err());

        grab.platform().set_fail_point(None);
        let buffer = grab.capture(Some(target)).unwrap();
        assert_eq!(buffer.bytes(), grab.platform().expected_rgb(target));
    }

    assert_eq!(grab.platform().live_handles(), 0);
}

#[test]
fn geometry_failure_when_capturing_the_screen() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    desktop.push_virtual_screen_reads((0..5).map(|_| None));

    let grab = ScreenGrab::with_platform(
        desktop,
        Config {
            stabilize_attempts: 5,
        },
    );

    let error = grab.capture(None).unwrap_err();
    assert_eq!(error.stage(), Some(Stage::Geometry));
    assert_eq!(grab.platform().native_calls(), 0);
}

#[test]
fn handle_count_is_stable_over_many_captures() {
    init_logger();

    let grab = grab(SimulatedDesktop::single_display(800, 600));
    let target = rect(0, 0, 1, 1);

    for _ in 0..10_000 {
        grab.capture(Some(target)).unwrap();
    }

    assert_eq!(grab.platform().live_handles(), 0);
    assert_eq!(grab.platform().native_calls(), 10_000 * 7);
}
