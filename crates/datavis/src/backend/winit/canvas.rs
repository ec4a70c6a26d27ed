use crate::coords::Point;
use crate::paint::Color;

/// CPU-side copy of a window's pixels.
///
/// Swapchain images are discarded after presentation, so every present
/// uploads the full buffer. Drawing only ever touches this copy.
#[derive(Debug, Clone)]
pub(crate) struct PixelBuffer {
    width: u32,
    height: u32,
    background: Color,
    pixels: Vec<Color>,
}

impl PixelBuffer {
    pub(crate) fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, x: i32, y: i32) -> Option<Color> {
        Point::new(x, y)
            .index_in(self.width, self.height)
            .map(|i| self.pixels[i])
    }

    /// Blends `color` onto the pixel at `(x, y)`; out-of-range writes are dropped.
    pub(crate) fn set(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = Point::new(x, y).index_in(self.width, self.height) {
            self.pixels[i] = color.over(self.pixels[i]);
        }
    }

    /// Resizes to `width`x`height`, keeping the overlapping region and
    /// filling new area with the background.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }

        let mut next = vec![self.background; width as usize * height as usize];
        let copy_w = self.width.min(width) as usize;
        for row in 0..self.height.min(height) as usize {
            let src = row * self.width as usize;
            let dst = row * width as usize;
            next[dst..dst + copy_w].copy_from_slice(&self.pixels[src..src + copy_w]);
        }

        self.width = width;
        self.height = height;
        self.pixels = next;
    }

    /// Encodes the buffer for an 8-bit surface format.
    ///
    /// Returns `None` for formats the upload path does not handle.
    pub(crate) fn encode(&self, format: wgpu::TextureFormat) -> Option<Vec<u8>> {
        use wgpu::TextureFormat as F;
        match format {
            F::Rgba8Unorm | F::Rgba8UnormSrgb => Some(bytemuck::cast_slice(&self.pixels).to_vec()),
            F::Bgra8Unorm | F::Bgra8UnormSrgb => Some(
                self.pixels
                    .iter()
                    .flat_map(|c| c.to_bgra_bytes())
                    .collect(),
            ),
            _ => None,
        }
    }
}

pub(crate) fn is_supported_format(format: wgpu::TextureFormat) -> bool {
    use wgpu::TextureFormat as F;
    matches!(
        format,
        F::Rgba8Unorm | F::Rgba8UnormSrgb | F::Bgra8Unorm | F::Bgra8UnormSrgb
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_filled_with_background() {
        let buf = PixelBuffer::new(3, 2, Color::WHITE);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buf.get(x, y), Some(Color::WHITE));
            }
        }
    }

    #[test]
    fn out_of_range_writes_are_dropped() {
        let mut buf = PixelBuffer::new(2, 2, Color::WHITE);
        buf.set(-1, 0, Color::RED);
        buf.set(2, 0, Color::RED);
        buf.set(0, 5, Color::RED);
        assert!(buf.pixels.iter().all(|&c| c == Color::WHITE));
    }

    #[test]
    fn resize_keeps_overlap_and_fills_background() {
        let mut buf = PixelBuffer::new(2, 2, Color::WHITE);
        buf.set(1, 1, Color::RED);
        buf.resize(3, 3);
        assert_eq!(buf.size(), (3, 3));
        assert_eq!(buf.get(1, 1), Some(Color::RED));
        assert_eq!(buf.get(2, 2), Some(Color::WHITE));

        buf.resize(1, 1);
        assert_eq!(buf.get(0, 0), Some(Color::WHITE));
        assert_eq!(buf.get(1, 1), None);
    }

    #[test]
    fn encode_orders_channels_per_format() {
        let mut buf = PixelBuffer::new(1, 1, Color::WHITE);
        buf.set(0, 0, Color::rgb(1, 2, 3));
        assert_eq!(buf.encode(wgpu::TextureFormat::Rgba8UnormSrgb), Some(vec![1, 2, 3, 255]));
        assert_eq!(buf.encode(wgpu::TextureFormat::Bgra8Unorm), Some(vec![3, 2, 1, 255]));
        assert_eq!(buf.encode(wgpu::TextureFormat::Rgba16Float), None);
    }
}
