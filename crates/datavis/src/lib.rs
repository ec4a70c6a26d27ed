//! Plot windows with pixel drawing and close synchronization.
//!
//! ```no_run
//! use datavis::{Color, Point, Window};
//!
//! let plot = Window::new(400, 400, "")?; // titled "Figure - 1"
//! plot.draw_points(&[Point::new(10, 10), Point::new(20, 20)], Color::RED);
//! datavis::wait_for_all_windows_closed();
//! # Ok::<(), datavis::PlotError>(())
//! ```

pub mod backend;
pub mod coords;
pub mod logging;
pub mod paint;

mod error;
mod registry;
mod sync;
mod window;

#[cfg(test)]
mod testing;

pub use coords::Point;
pub use error::{PlotError, Result};
pub use paint::Color;
pub use registry::{
    close_all_windows, global, initialize, initialize_with, wait_for_all_windows_closed,
    Registry, RegistryConfig, WindowKey,
};
pub use window::Window;
