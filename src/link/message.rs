/*
 *  link/message.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Message contract between a display session and the hardware adapters
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

use std::time::Duration;

use crate::link::error::{GpioError, TransportError};

/// Requests a display session makes of the byte transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMessage<'a> {
    /// Open the bus (once per session)
    Init,

    /// Select data (true) or command (false) for the following bytes
    SetDataMode(bool),

    /// Start of a logical transfer
    BeginFrame,

    /// Raw bytes for the controller
    Send(&'a [u8]),

    /// End of a logical transfer
    EndFrame,
}

/// Output lines the upstream protocol knows about
///
/// Only `ChipSelect` and `Reset` are wired on the hardware SPI target. The
/// remaining roles belong to bit-banged, parallel or I2C wirings; the spidev
/// driver owns clock and data itself, so writes to these roles are accepted
/// and have no physical effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinRole {
    ChipSelect,
    Reset,
    /// D0, doubles as the SPI clock when bit-banging
    SpiClock,
    /// D1, doubles as the SPI data line when bit-banging
    SpiData,
    /// Parallel bus lines D2..=D7
    Data(u8),
    /// E / WR strobe
    Enable,
    /// Data/command (A0, register select)
    DataCommand,
    ChipSelect1,
    ChipSelect2,
    I2cClock,
    I2cData,
}

/// Optional menu buttons a session may poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    MenuSelect,
    MenuNext,
    MenuPrev,
    MenuHome,
}

impl InputRole {
    pub const ALL: [InputRole; 4] = [
        InputRole::MenuSelect,
        InputRole::MenuNext,
        InputRole::MenuPrev,
        InputRole::MenuHome,
    ];
}

/// Level reported for an input role that has no physical line behind it
pub const INPUT_DEFAULT: bool = false;

/// Delay request in the step sizes controller timing tables are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayUnit {
    Nanos(u32),
    HundredNanos(u32),
    TenMicros(u32),
    Millis(u32),
}

impl DelayUnit {
    /// Exact conversion; every step is a whole number of nanoseconds
    pub fn to_duration(self) -> Duration {
        match self {
            DelayUnit::Nanos(n) => Duration::from_nanos(u64::from(n)),
            DelayUnit::HundredNanos(n) => Duration::from_nanos(u64::from(n) * 100),
            DelayUnit::TenMicros(n) => Duration::from_micros(u64::from(n) * 10),
            DelayUnit::Millis(n) => Duration::from_millis(u64::from(n)),
        }
    }
}

impl From<DelayUnit> for Duration {
    fn from(unit: DelayUnit) -> Self {
        unit.to_duration()
    }
}

/// Requests a display session makes of the GPIO/timing adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioMessage {
    /// Claim the configured lines (once per session)
    Init,
    Delay(DelayUnit),
    Write(PinRole, bool),
    Query(InputRole),
}

/// Answer to a `GpioMessage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioReply {
    Done,
    Level(bool),
}

/// Byte transfer half of the contract
pub trait ByteLink {
    fn handle(&mut self, msg: TransportMessage<'_>) -> Result<(), TransportError>;
}

/// GPIO and timing half of the contract
pub trait ControlLink {
    fn handle(&mut self, msg: GpioMessage) -> Result<GpioReply, GpioError>;
}
