//! Prints the raw display rects whenever they change.

#[cfg(windows)]
fn main() {
    use screengrab::{Gdi, GeometrySource};
    use testing::setup_logger;

    let _logger = setup_logger().unwrap();

    let mut last = None;
    loop {
        let rects = Gdi.display_rects().map_err(|e| e.to_string());
        if last.as_ref() != Some(&rects) {
            match &rects {
                Ok(rects) => println!("{rects:?}"),
                Err(e) => println!("{e}"),
            }
            last = Some(rects);
        }
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("watch-display-rects reads the Windows display configuration");
}
