/*
 *  demo.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Demo scene and clock refresh loop
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

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_4X6, FONT_5X8},
        MonoTextStyle, MonoTextStyleBuilder,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::Text,
};
use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::traits::DisplayDriver;
use crate::display::xbm::Xbm;

/// C library `ctime` layout, without the trailing newline
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Baseline of the clock line
pub const CLOCK_BASELINE: i32 = 24;

const CLOCK_ICON_WIDTH: u32 = 16;
const CLOCK_ICON_HEIGHT: u32 = 16;
static CLOCK_ICON_BITS: [u8; 32] = [
    0x00, 0x00, 0xf0, 0x0f, 0x38, 0x1c, 0x8c, 0x30,
    0x86, 0x60, 0x86, 0x60, 0x82, 0x40, 0x82, 0x4f,
    0x02, 0x40, 0x02, 0x40, 0x06, 0x60, 0x06, 0x60,
    0x0c, 0x30, 0x38, 0x1c, 0xf0, 0x0f, 0x00, 0x00,
];

const DIAL_CENTER: Point = Point::new(50, 35);
const ICON_ORIGIN: Point = Point::new(96, 30);

/// Everything that does not change between refreshes
pub fn draw_static_scene<D>(target: &mut D, footer: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let text = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
    Text::new("Hello World!", Point::new(0, 8), text).draw(target)?;
    Text::new("ST7920 over spidev + gpio", Point::new(0, 16), text).draw(target)?;

    // filled dial, knocked out bar and hub
    Circle::with_center(DIAL_CENTER, 31)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;
    Line::new(Point::new(25, DIAL_CENTER.y), Point::new(84, DIAL_CENTER.y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::Off, 1))
        .draw(target)?;
    Circle::with_center(DIAL_CENTER, 7)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(target)?;

    Xbm::new(&CLOCK_ICON_BITS, CLOCK_ICON_WIDTH, CLOCK_ICON_HEIGHT, ICON_ORIGIN).draw(target)?;

    let tiny = MonoTextStyle::new(&FONT_4X6, BinaryColor::On);
    Text::new(footer, Point::new(0, 62), tiny).draw(target)?;
    Ok(())
}

pub fn clock_text<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format(CTIME_FORMAT).to_string()
}

/// Draw `text` on the clock line; glyph cells are painted solid so the
/// previous string never shows through
pub fn draw_clock<D>(target: &mut D, text: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyleBuilder::new()
        .font(&FONT_5X8)
        .text_color(BinaryColor::On)
        .background_color(BinaryColor::Off)
        .build();
    Text::new(text, Point::new(0, CLOCK_BASELINE), style).draw(target)?;
    Ok(())
}

/// Bring the panel up, paint the scene and refresh the clock every `refresh`
///
/// Runs until `frames` refreshes have gone out, or forever when `None`.
/// Returns the number of frames sent.
pub fn run(
    driver: &mut dyn DisplayDriver,
    refresh: Duration,
    frames: Option<u64>,
) -> Result<u64, DisplayError> {
    driver.init()?;
    driver.set_power_save(false)?;

    let footer = format!("st7920-link v{}", env!("CARGO_PKG_VERSION"));
    draw_static_scene(driver.framebuffer_mut(), &footer)?;
    info!("Display running, refresh every {:?}", refresh);

    let mut sent = 0u64;
    loop {
        let text = clock_text(&Local::now());
        draw_clock(driver.framebuffer_mut(), &text)?;
        driver.flush()?;
        sent += 1;
        debug!("frame {} {}", sent, text);

        if frames.is_some_and(|limit| sent >= limit) {
            return Ok(sent);
        }
        thread::sleep(refresh);
    }
}
