//! Window pixel coordinates.
//!
//! Origin top-left, +X right, +Y down, physical pixels. There is no plot
//! space here; points address the window surface directly.

mod point;

pub use point::Point;
