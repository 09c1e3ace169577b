/*
 *  display/xbm.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  XBM bitmaps as embedded-graphics drawables
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

/// An XBM bitmap placed at `origin`
///
/// XBM rows are padded to whole bytes with the least significant bit as the
/// leftmost pixel. Set bits draw in `color`, clear bits leave the target alone.
#[derive(Debug, Clone, Copy)]
pub struct Xbm<'a> {
    bits: &'a [u8],
    width: u32,
    height: u32,
    origin: Point,
    color: BinaryColor,
}

impl<'a> Xbm<'a> {
    pub fn new(bits: &'a [u8], width: u32, height: u32, origin: Point) -> Self {
        Self { bits, width, height, origin, color: BinaryColor::On }
    }

    pub fn with_color(mut self, color: BinaryColor) -> Self {
        self.color = color;
        self
    }

    fn stride(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    /// Positions of the set bits; rows missing from `bits` are treated as empty
    fn set_points(&self) -> impl Iterator<Item = Point> + '_ {
        let stride = self.stride();
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let byte = self.bits.get(y as usize * stride + x as usize / 8)?;
                (byte & (1 << (x % 8)) != 0)
                    .then(|| self.origin + Point::new(x as i32, y as i32))
            })
        })
    }
}

impl OriginDimensions for Xbm<'_> {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Drawable for Xbm<'_> {
    type Color = BinaryColor;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.draw_iter(self.set_points().map(|p| Pixel(p, self.color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::framebuffer::MonoFrameBuffer;

    #[test]
    fn lsb_is_the_leftmost_pixel() {
        let mut fb = MonoFrameBuffer::new(16, 2);
        // 10 pixels wide -> two bytes per row
        let bits = [0b0000_0001, 0b0000_0010, 0b1000_0000, 0x00];
        Xbm::new(&bits, 10, 2, Point::new(2, 0)).draw(&mut fb).unwrap();

        assert_eq!(fb.pixel(2, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(11, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(9, 1), Some(BinaryColor::On));
        assert_eq!(fb.count_on_pixels(), 3);
    }

    #[test]
    fn clear_bits_are_transparent() {
        let mut fb = MonoFrameBuffer::new(8, 1);
        fb.clear_color(BinaryColor::On);
        Xbm::new(&[0x00], 8, 1, Point::zero()).draw(&mut fb).unwrap();
        assert_eq!(fb.count_on_pixels(), 8);

        Xbm::new(&[0x0F], 8, 1, Point::zero())
            .with_color(BinaryColor::Off)
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.row(0), Some(&[0x0F][..]));
    }

    #[test]
    fn short_bit_slices_do_not_panic() {
        let mut fb = MonoFrameBuffer::new(8, 8);
        Xbm::new(&[0xFF], 8, 8, Point::zero()).draw(&mut fb).unwrap();
        assert_eq!(fb.count_on_pixels(), 8);
    }
}
