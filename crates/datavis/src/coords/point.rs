/// A pixel position in window coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the buffer index of this point in a `width`x`height` grid,
    /// or `None` when it falls outside.
    #[inline]
    pub fn index_in(self, width: u32, height: u32) -> Option<usize> {
        let x = u32::try_from(self.x).ok()?;
        let y = u32::try_from(self.y).ok()?;
        if x >= width || y >= height {
            return None;
        }
        Some(y as usize * width as usize + x as usize)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}
