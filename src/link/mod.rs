/*
 *  link/mod.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Hardware link - transport and GPIO/timing adapters behind a message contract
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

pub mod error;
pub mod message;
pub mod transport;
pub mod gpio;

// Recording doubles, also used by the emulated display mode
pub mod mock;

pub use error::{GpioError, LinkError, SetupError, TransportError};
pub use message::{
    ByteLink, ControlLink, DelayUnit, GpioMessage, GpioReply, InputRole, PinRole,
    TransportMessage, INPUT_DEFAULT,
};
pub use transport::{BusOpener, BusSettings, SpiTransport, SpidevOpener, TransportHandle};
pub use gpio::{CdevBackend, GpioAdapter, GpioBackend, MenuLines, PinAssignment};
