//! Tests for the DisplayCompositor
//!

use screengrab::{
    CaptureError, Config, DisplayCompositor, DisplaysOutsideCapture, FailureSource, Rect,
    ScreenGrab, Stage, normalize_rects,
};
use test_helper::{
    logger::init_logger,
    simulated::{Event, SimulatedDesktop},
};

fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
    Rect {
        left,
        top,
        right,
        bottom,
    }
}

#[test]
fn one_buffer_per_display_in_order() {
    init_logger();

    let displays = vec![
        rect(0, 0, 1920, 1080),
        rect(-1280, -300, 0, 724),
        rect(1920, 200, 2720, 800),
    ];
    let grab = ScreenGrab::with_platform(SimulatedDesktop::new(displays.clone()), Config::default());

    let buffers = grab.capture_all_displays().unwrap();
    let stable = grab.stable_display_rects().unwrap();

    assert_eq!(buffers.len(), stable.len());
    for (buffer, display) in buffers.iter().zip(&stable) {
        assert_eq!(buffer.size(), display.size());
        assert_eq!(buffer.bytes(), grab.platform().expected_rgb(*display));
    }
}

#[test]
fn captures_the_screen_once() {
    init_logger();

    let desktop = SimulatedDesktop::new(vec![rect(0, 0, 640, 480), rect(640, 0, 1280, 480)]);

    let buffers = DisplayCompositor::new(&desktop, Config::default())
        .capture_all_displays()
        .unwrap();

    assert_eq!(buffers.len(), 2);

    let blits: Vec<_> = desktop
        .events()
        .into_iter()
        .filter(|event| matches!(event, Event::Blit(_)))
        .collect();
    assert_eq!(blits, vec![Event::Blit(rect(0, 0, 1280, 480))]);
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn normalized_rects_start_at_zero() {
    let displays = vec![
        rect(0, 0, 1920, 1080),
        rect(-1280, -300, 0, 724),
        rect(1920, 200, 2720, 800),
    ];

    let normalized = normalize_rects(&displays);

    assert_eq!(normalized.iter().map(|rect| rect.left).min(), Some(0));
    assert_eq!(normalized.iter().map(|rect| rect.top).min(), Some(0));
    assert_eq!(normalized[0], rect(1280, 300, 3200, 1380));
    assert_eq!(normalized[1], rect(0, 0, 1280, 1024));
    assert!(normalize_rects(&[]).is_empty());
}

#[test]
fn unstable_displays_fail_at_the_geometry_stage() {
    init_logger();

    let desktop = SimulatedDesktop::single_display(800, 600);
    desktop.push_display_reads((0..4).map(|index| Some(vec![rect(0, 0, 800 + index, 600)])));

    let config = Config {
        stabilize_attempts: 4,
    };
    let error = DisplayCompositor::new(&desktop, config)
        .capture_all_displays()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Geometry));
    assert!(matches!(
        error,
        CaptureError::CaptureFailed {
            source: FailureSource::Geometry(_),
            ..
        }
    ));
    assert_eq!(desktop.native_calls(), 0);
}

#[test]
fn reconfiguration_between_reads_fails_to_composite() {
    init_logger();

    let desktop = SimulatedDesktop::new(vec![rect(0, 0, 800, 600), rect(800, 0, 1600, 600)]);

    // The second display disappears after the display rects were read.
    let shrunk = rect(0, 0, 800, 600);
    desktop.push_display_reads([Some(desktop.displays()), Some(desktop.displays())]);
    desktop.push_virtual_screen_reads([Some(shrunk), Some(shrunk)]);

    let error = DisplayCompositor::new(&desktop, Config::default())
        .capture_all_displays()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Composite));
    assert_eq!(desktop.live_handles(), 0);
}

#[test]
fn displays_offset_from_the_virtual_screen_fail_to_composite() {
    init_logger();

    let desktop = SimulatedDesktop::new(vec![rect(-800, 0, 0, 600), rect(0, 0, 800, 600)]);

    // Only the primary display was read, but the virtual screen still spans both. The
    // primary display's crop fits inside the capture at the wrong offset.
    let primary = vec![rect(0, 0, 800, 600)];
    desktop.push_display_reads([Some(primary.clone()), Some(primary.clone())]);

    let error = DisplayCompositor::new(&desktop, Config::default())
        .capture_all_displays()
        .unwrap_err();

    assert_eq!(error.stage(), Some(Stage::Composite));
    let CaptureError::CaptureFailed {
        source: FailureSource::Reconfigured(DisplaysOutsideCapture {
            displays,
            virtual_screen,
        }),
        ..
    } = error
    else {
        panic!("unexpected error {error}");
    };
    assert_eq!(displays, primary);
    assert_eq!(virtual_screen, rect(-800, 0, 800, 600));

    assert_eq!(desktop.native_calls(), 0);
    assert_eq!(desktop.live_handles(), 0);
}
