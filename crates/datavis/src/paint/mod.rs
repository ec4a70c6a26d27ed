//! Pixel color model.
//!
//! Drawing here is raw pixel writes, so colors stay in 8-bit straight-alpha
//! sRGB, the same encoding the swapchain formats expect.

mod color;

pub use color::Color;
