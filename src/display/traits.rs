/*
 *  display/traits.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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

use crate::display::error::DisplayError;
use crate::display::framebuffer::MonoFrameBuffer;

/// Display capabilities and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Maximum recommended frame rate
    pub max_fps: u32,

    /// Whether the controller can blank the panel without losing RAM
    pub supports_power_save: bool,
}

/// Minimal hardware abstraction - all display drivers must implement this trait
///
/// Drawing happens on the driver's framebuffer through embedded-graphics;
/// `flush` pushes it to the controller. DrawTarget is not dyn compatible, so
/// the framebuffer is exposed as a concrete type instead.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Bring up the link and send the controller init sequence
    ///
    /// The panel is left in power save; call `set_power_save(false)` to show it.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Blank (true) or show (false) the panel
    fn set_power_save(&mut self, enabled: bool) -> Result<(), DisplayError>;

    /// Flush the current framebuffer to the display hardware
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Clear the display to blank/off state
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Replace the framebuffer with a packed buffer and flush it
    ///
    /// Rows are packed 8 pixels per byte, most significant bit leftmost.
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// Drawing surface for the next flush
    fn framebuffer_mut(&mut self) -> &mut MonoFrameBuffer;
}
