//! Display list words.
//!
//! Only the primitives the driver itself emits are here: the blank first frame
//! and the calibration targets.

use embedded_graphics_core::pixelcolor::{Rgb888, RgbColor};

/// Graphics primitive selected by [`begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Primitive {
    Points = 2,
}

fn rgb(color: Rgb888) -> u32 {
    (u32::from(color.r()) << 16) | (u32::from(color.g()) << 8) | u32::from(color.b())
}

/// End of the display list.
pub const fn display() -> u32 {
    0x00
}

pub fn clear_color(color: Rgb888) -> u32 {
    (0x02 << 24) | rgb(color)
}

/// Clears the color, stencil and tag buffers as selected.
pub const fn clear(color: bool, stencil: bool, tag: bool) -> u32 {
    (0x26 << 24) | ((color as u32) << 2) | ((stencil as u32) << 1) | tag as u32
}

pub fn color(color: Rgb888) -> u32 {
    (0x04 << 24) | rgb(color)
}

/// Point radius in 1/16 pixel.
pub const fn point_size(size: u16) -> u32 {
    (0x0D << 24) | (size as u32 & 0x1FFF)
}

pub const fn begin(primitive: Primitive) -> u32 {
    (0x1F << 24) | (primitive as u32 & 0x0F)
}

pub const fn end() -> u32 {
    0x21 << 24
}

/// Fractional bits of [`vertex2f`] coordinates, 0 to 4.
pub const fn vertex_format(frac_bits: u8) -> u32 {
    (0x27 << 24) | (frac_bits as u32 & 0x07)
}

/// Vertex in the units selected by [`vertex_format`] (1/16 pixel by default).
pub const fn vertex2f(x: i16, y: i16) -> u32 {
    (1 << 30) | ((x as u32 & 0x7FFF) << 15) | (y as u32 & 0x7FFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_words() {
        assert_eq!(clear_color(Rgb888::BLACK), 0x0200_0000);
        assert_eq!(clear(true, true, true), 0x2600_0007);
        assert_eq!(color(Rgb888::RED), 0x04FF_0000);
        assert_eq!(point_size(20 * 16), 0x0D00_0140);
        assert_eq!(begin(Primitive::Points), 0x1F00_0002);
        assert_eq!(end(), 0x2100_0000);
        assert_eq!(display(), 0);
        assert_eq!(vertex_format(0), 0x2700_0000);
    }

    #[test]
    fn vertex_packs_both_axes() {
        assert_eq!(vertex2f(16, 32), 0x4000_0000 | (16 << 15) | 32);
        // negative coordinates keep 15 bits of two's complement
        assert_eq!(vertex2f(-1, 0), 0x4000_0000 | (0x7FFF << 15));
    }
}
