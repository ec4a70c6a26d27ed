//! Draws random points one at a time.
//!
//! Each `draw_point` presents the whole window, which is why this is the
//! slow path; compare with `plot_many_points`.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use datavis::Window;
use rand::Rng;

fn main() -> Result<()> {
    datavis_demos::init();

    let plot = Arc::new(Window::new(400, 400, "")?);
    log::info!("opened {:?}", plot.title());

    thread::spawn({
        let plot = Arc::clone(&plot);
        move || random_draw(&plot)
    });

    datavis::wait_for_all_windows_closed();
    Ok(())
}

fn random_draw(plot: &Window) {
    let mut rng = rand::thread_rng();

    while !plot.is_closed() {
        // Window size is only sampled every 10 points.
        let (width, height) = (plot.window_width() as i32, plot.window_height() as i32);
        if width == 0 || height == 0 {
            break;
        }

        for _ in 0..10 {
            let color = datavis_demos::random_color(&mut rng);
            plot.draw_point(rng.gen_range(0..width), rng.gen_range(0..height), color);
        }
    }
}
