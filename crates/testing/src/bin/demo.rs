//! Saves a few captures to the working directory.

#[cfg(windows)]
fn main() {
    use screengrab::{Rect, ScreenGrab};
    use testing::{load_config, save_png, setup_logger};
    use tracing::info_span;

    let _logger = setup_logger().unwrap();
    let grab = ScreenGrab::with_config(load_config().unwrap());

    // BMP at the screen's bit depth, no image library involved.
    {
        let _span = info_span!("Bitmaps").entered();

        grab.save_bmp("screencapture_entire.bmp", None).unwrap();
        grab.save_bmp(
            "screencapture_256_256.bmp",
            Some(Rect::new(0, 0, 256, 256).unwrap()),
        )
        .unwrap();
    }

    {
        let _span = info_span!("Entire screen").entered();

        let screen = grab.capture(None).unwrap();
        save_png(&screen, "screencapture_entire.png").unwrap();
    }

    // Every display from a single capture.
    {
        let _span = info_span!("Synchronized displays").entered();

        for (index, display) in grab.capture_all_displays().unwrap().iter().enumerate() {
            save_png(display, &format!("screencapture_display_{index}.png")).unwrap();
        }
    }

    // Each display captured on its own, these may show different moments.
    {
        let _span = info_span!("Unsynchronized displays").entered();

        for (index, rect) in grab.stable_display_rects().unwrap().into_iter().enumerate() {
            let display = grab.capture(Some(rect)).unwrap();
            save_png(
                &display,
                &format!("screencapture_unsynchronized_display_{index}.png"),
            )
            .unwrap();
        }
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("demo captures the Windows desktop");
}
