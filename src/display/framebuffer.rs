/*
 *  display/framebuffer.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Packed monochrome framebuffer in controller GDRAM order
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized 1-bpp framebuffer for embedded-graphics.
///
/// Rows are stored top to bottom, 8 pixels per byte, most significant bit
/// leftmost. That is the ST7920 GDRAM layout, so a row goes out as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoFrameBuffer {
    buf: Vec<u8>,
    w: usize,
    h: usize,
    stride: usize,
}

impl MonoFrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        let stride = w.div_ceil(8);
        Self { buf: vec![0; stride * h], w, h, stride }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Bytes per row
    pub fn stride(&self) -> usize { self.stride }

    pub fn as_bytes(&self) -> &[u8] { &self.buf }

    /// Packed bytes of one row, None past the last row
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.h {
            return None;
        }
        let start = y * self.stride;
        self.buf.get(start..start + self.stride)
    }

    /// Overwrite the whole buffer; `bytes` must be `stride * height` long
    pub fn load(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() != self.buf.len() {
            return false;
        }
        self.buf.copy_from_slice(bytes);
        true
    }

    pub fn clear_color(&mut self, color: BinaryColor) {
        self.buf.fill(if color.is_on() { 0xFF } else { 0x00 });
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        let (i, mask) = self.locate(Point::new(x as i32, y as i32))?;
        Some(BinaryColor::from(self.buf[i] & mask != 0))
    }

    pub fn count_on_pixels(&self) -> usize {
        (0..self.h)
            .map(|y| {
                (0..self.w)
                    .filter(|&x| self.buf[y * self.stride + x / 8] & (0x80 >> (x % 8)) != 0)
                    .count()
            })
            .sum()
    }

    /// Map (x,y) to byte index and bit mask; None if out of bounds
    #[inline]
    fn locate(&self, p: Point) -> Option<(usize, u8)> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some((y * self.stride + x / 8, 0x80 >> (x % 8)));
            }
        }
        None
    }

    #[inline]
    fn set(&mut self, p: Point, color: BinaryColor) {
        if let Some((i, mask)) = self.locate(p) {
            if color.is_on() {
                self.buf[i] |= mask;
            } else {
                self.buf[i] &= !mask;
            }
        }
    }
}

impl OriginDimensions for MonoFrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for MonoFrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.set(p, c);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if let Some(bottom_right) = area.bottom_right() {
            for y in area.top_left.y..=bottom_right.y {
                for x in area.top_left.x..=bottom_right.x {
                    self.set(Point::new(x, y), color);
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn pixels_pack_msb_first() {
        let mut fb = MonoFrameBuffer::new(16, 2);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(9, 1), BinaryColor::On).draw(&mut fb).unwrap();

        assert_eq!(fb.row(0), Some(&[0x80, 0x00][..]));
        assert_eq!(fb.row(1), Some(&[0x00, 0x40][..]));
        assert_eq!(fb.count_on_pixels(), 2);
    }

    #[test]
    fn out_of_bounds_pixels_are_clipped() {
        let mut fb = MonoFrameBuffer::new(8, 8);
        Line::new(Point::new(-4, 3), Point::new(20, 3))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(fb.row(3), Some(&[0xFF][..]));
        assert_eq!(fb.count_on_pixels(), 8);
        assert_eq!(fb.pixel(8, 3), None);
    }

    #[test]
    fn fill_solid_clears_inside_a_lit_area() {
        let mut fb = MonoFrameBuffer::new(16, 4);
        fb.clear_color(BinaryColor::On);
        fb.fill_solid(&Rectangle::new(Point::new(4, 1), Size::new(8, 2)), BinaryColor::Off).unwrap();

        assert_eq!(fb.row(0), Some(&[0xFF, 0xFF][..]));
        assert_eq!(fb.row(1), Some(&[0xF0, 0x0F][..]));
        assert_eq!(fb.pixel(4, 2), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(3, 2), Some(BinaryColor::On));
    }

    #[test]
    fn load_rejects_wrong_sizes() {
        let mut fb = MonoFrameBuffer::new(128, 64);
        assert!(!fb.load(&[0xFF; 512]));
        assert!(fb.load(&[0xFF; 1024]));
        assert_eq!(fb.count_on_pixels(), 128 * 64);
    }

    #[test]
    fn rows_past_the_bottom_are_none() {
        let fb = MonoFrameBuffer::new(16, 4);
        assert_eq!(fb.row(3).map(<[u8]>::len), Some(2));
        assert_eq!(fb.row(4), None);
        assert_eq!(fb.row(usize::MAX), None);
    }

    #[test]
    fn odd_widths_round_the_stride_up() {
        let fb = MonoFrameBuffer::new(10, 3);
        assert_eq!(fb.stride(), 2);
        assert_eq!(fb.as_bytes().len(), 6);
    }
}
