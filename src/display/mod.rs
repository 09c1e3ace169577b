/*
 *  display/mod.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display driver abstraction and the ST7920 driver
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod xbm;
pub mod factory;

// Display drivers
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplayDriver, DisplayCapabilities};
pub use error::{DisplayError, DisplayFactoryError};
pub use framebuffer::MonoFrameBuffer;
pub use xbm::Xbm;
pub use factory::{DisplayDriverFactory, BoxedDriver, EmulatedDriver, HardwareDriver};
pub use drivers::st7920::{St7920Driver, St7920Interface};
