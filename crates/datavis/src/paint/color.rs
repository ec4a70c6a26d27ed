/// Straight-alpha sRGB color, one byte per channel.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const RED: Color = Color::rgb(0xff, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 0xff, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 0xff);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }

    /// Parses a packed `0xRRGGBBAA` value.
    #[inline]
    pub const fn from_u32(rgba: u32) -> Self {
        let [r, g, b, a] = rgba.to_be_bytes();
        Self::rgba(r, g, b, a)
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a == 0xff
    }

    /// Byte layout for `Rgba8*` texture formats.
    #[inline]
    pub const fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Byte layout for `Bgra8*` texture formats.
    #[inline]
    pub const fn to_bgra_bytes(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }

    /// Composites `self` over an opaque `dst`.
    ///
    /// Plot windows have an opaque background, so the result is always opaque.
    pub fn over(self, dst: Color) -> Color {
        match self.a {
            0xff => self,
            0 => dst,
            a => {
                let a = a as u16;
                let inv = 0xff - a;
                let mix = |s: u8, d: u8| ((s as u16 * a + d as u16 * inv + 127) / 0xff) as u8;
                Color::rgb(mix(self.r, dst.r), mix(self.g, dst.g), mix(self.b, dst.b))
            }
        }
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_u32_is_rrggbbaa() {
        assert_eq!(Color::from_u32(0x11223344), Color::rgba(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        assert_eq!(Color::rgba(1, 2, 3, 4).to_bgra_bytes(), [3, 2, 1, 4]);
        assert_eq!(Color::rgba(1, 2, 3, 4).to_rgba_bytes(), [1, 2, 3, 4]);
    }

    #[test]
    fn over_opaque_replaces() {
        assert_eq!(Color::RED.over(Color::WHITE), Color::RED);
    }

    #[test]
    fn over_transparent_keeps_destination() {
        assert_eq!(Color::TRANSPARENT.over(Color::BLUE), Color::BLUE);
    }

    #[test]
    fn over_half_alpha_mixes() {
        let c = Color::rgba(0, 0, 0, 128).over(Color::WHITE);
        assert!(c.is_opaque());
        assert_eq!(c.r, c.g);
        assert!((126..=128).contains(&c.r), "got {}", c.r);
    }
}
