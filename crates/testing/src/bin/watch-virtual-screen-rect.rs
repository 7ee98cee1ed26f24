//! Prints the raw virtual screen rect whenever it changes.

#[cfg(windows)]
fn main() {
    use screengrab::{Gdi, GeometrySource};
    use testing::setup_logger;

    let _logger = setup_logger().unwrap();

    let mut last = None;
    loop {
        let rect = Gdi.virtual_screen_rect().map_err(|e| e.to_string());
        if last.as_ref() != Some(&rect) {
            match &rect {
                Ok(rect) => println!("{rect}"),
                Err(e) => println!("{e}"),
            }
            last = Some(rect);
        }
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("watch-virtual-screen-rect reads the Windows display configuration");
}
