//! Opens an empty plot window and closes it from another thread.
//!
//! The main thread blocks in `wait_for_all_windows_closed` while the event
//! thread keeps the window responsive; closing it by hand also ends the wait.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use datavis::Window;

const CLOSE_AFTER: Duration = Duration::from_secs(15);

fn main() -> Result<()> {
    datavis_demos::init();

    let plot = Window::new(300, 400, "")?;
    log::info!("opened {:?}, closing in {}s", plot.title(), CLOSE_AFTER.as_secs());

    thread::spawn(|| {
        thread::sleep(CLOSE_AFTER);
        datavis::close_all_windows();
    });

    datavis::wait_for_all_windows_closed();
    log::info!("all windows closed");
    Ok(())
}
