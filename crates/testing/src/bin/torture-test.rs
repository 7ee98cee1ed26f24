//! Captures in a loop while displays are reconfigured by hand.
//!
//! Prints `S` for a whole screen capture, `D` for a capture of all displays and `R` for a
//! capture of a 1x1 rect. Failures are printed and the loop continues.

#[cfg(windows)]
fn main() {
    use std::io::{Write, stdout};

    use screengrab::{Rect, ScreenGrab};
    use testing::{load_config, setup_logger};

    let _logger = setup_logger().unwrap();
    let grab = ScreenGrab::with_config(load_config().unwrap());
    let rect = Rect::new(0, 0, 1, 1).unwrap();

    let mut stdout = stdout();
    loop {
        match grab.capture(None) {
            Ok(_) => print!("S"),
            Err(e) => println!("\n{e}"),
        }

        match grab.capture_all_displays() {
            Ok(_) => print!("D"),
            Err(e) => println!("\n{e}"),
        }

        match grab.capture(Some(rect)) {
            Ok(_) => print!("R"),
            Err(e) => println!("\n{e}"),
        }

        stdout.flush().unwrap();
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("torture-test captures the Windows desktop");
}
