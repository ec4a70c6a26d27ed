//! Draws batches of 10,000 random points, one present per batch.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use datavis::{Point, Window};
use rand::Rng;

const BATCH: usize = 10_000;

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
    let mut points = vec![Point::default(); BATCH];

    while !plot.is_closed() {
        let (width, height) = (plot.window_width() as i32, plot.window_height() as i32);
        if width == 0 || height == 0 {
            break;
        }

        for p in points.iter_mut() {
            *p = Point::new(rng.gen_range(0..width), rng.gen_range(0..height));
        }

        let color = datavis_demos::random_color(&mut rng);
        plot.draw_points(&points, color);
    }
}
