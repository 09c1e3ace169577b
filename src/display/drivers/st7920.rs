/*
 *  display/drivers/st7920.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7920 graphics LCD driver, serial (SPI) mode
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

use display_interface::{DataFormat, DisplayError as InterfaceError, WriteOnlyDataCommand};
use log::{debug, info, warn};

use crate::display::error::DisplayError;
use crate::display::framebuffer::MonoFrameBuffer;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::link::{
    ByteLink, ControlLink, DelayUnit, GpioMessage, GpioReply, InputRole, LinkError, PinRole,
    TransportMessage, INPUT_DEFAULT,
};

/// Sync byte announcing instruction bytes (RW=0, RS=0)
pub const SYNC_COMMAND: u8 = 0xF8;
/// Sync byte announcing display RAM bytes (RW=0, RS=1)
pub const SYNC_DATA: u8 = 0xFA;

// Instruction set
const FUNCTION_SET_BASIC: u8 = 0x38;
const DISPLAY_OFF: u8 = 0x08;
const DISPLAY_ON: u8 = 0x0C;
const CURSOR_SHIFT: u8 = 0x10;
const EXTENDED_GRAPHICS: u8 = 0x3E;
const SET_GDRAM_ADDRESS: u8 = 0x80;
const ENTRY_MODE_INCREMENT: u8 = 0x06;
const DISPLAY_CLEAR: u8 = 0x01;

// basic instruction set; the clear blanks DDRAM so no text shows over GDRAM
const INIT_BASIC: [u8; 5] = [
    FUNCTION_SET_BASIC,
    DISPLAY_OFF,
    CURSOR_SHIFT,
    ENTRY_MODE_INCREMENT,
    DISPLAY_CLEAR,
];
const INIT_GRAPHICS: [u8; 2] = [EXTENDED_GRAPHICS, EXTENDED_GRAPHICS];

// display clear needs 1.6ms
const CLEAR_DELAY: DelayUnit = DelayUnit::Millis(2);

// Instructions take up to 72us to execute
const COMMAND_DELAY: DelayUnit = DelayUnit::TenMicros(8);

/// GDRAM is 256x32; the lower half of a 64 row panel sits to the right
const GDRAM_ROWS: usize = 32;

/// Serial frame for `bytes`: the sync byte, then each byte split into a
/// high and a low nibble, both left aligned
pub fn encode(sync: u8, bytes: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + bytes.len() * 2);
    frame.push(sync);
    for &b in bytes {
        frame.push(b & 0xF0);
        frame.push(b << 4);
    }
    frame
}

/// ST7920 serial protocol on top of the link message contract
pub struct St7920Interface<T: ByteLink, C: ControlLink> {
    transport: T,
    control: C,
}

impl<T: ByteLink, C: ControlLink> St7920Interface<T, C> {
    pub fn new(transport: T, control: C) -> Self {
        Self { transport, control }
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.control)
    }

    /// Open the bus, then claim the control lines
    pub fn init_link(&mut self) -> Result<(), LinkError> {
        self.transport.handle(TransportMessage::Init)?;
        self.control.handle(GpioMessage::Init)?;
        Ok(())
    }

    pub fn set_pin(&mut self, role: PinRole, level: bool) -> Result<(), LinkError> {
        self.control.handle(GpioMessage::Write(role, level))?;
        Ok(())
    }

    pub fn delay(&mut self, unit: DelayUnit) -> Result<(), LinkError> {
        self.control.handle(GpioMessage::Delay(unit))?;
        Ok(())
    }

    /// Level of a menu input; a control link answering without a level
    /// is logged and read as `INPUT_DEFAULT`
    pub fn query(&mut self, role: InputRole) -> Result<bool, LinkError> {
        match self.control.handle(GpioMessage::Query(role))? {
            GpioReply::Level(level) => Ok(level),
            GpioReply::Done => {
                warn!("control link answered {:?} query without a level", role);
                Ok(INPUT_DEFAULT)
            }
        }
    }

    /// Hardware reset pulse
    pub fn reset(&mut self) -> Result<(), LinkError> {
        self.set_pin(PinRole::Reset, true)?;
        self.delay(DelayUnit::Millis(1))?;
        self.set_pin(PinRole::Reset, false)?;
        self.delay(DelayUnit::Millis(1))?;
        self.set_pin(PinRole::Reset, true)?;
        self.delay(DelayUnit::Millis(50))
    }

    /// Run `body` with chip-select asserted
    ///
    /// Chip-select is released whatever `body` returns; the first error wins.
    pub fn transaction<R>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<R, LinkError>,
    ) -> Result<R, LinkError> {
        // ST7920 chip-select is active high
        self.set_pin(PinRole::ChipSelect, true)?;
        let result = self.transport
            .handle(TransportMessage::BeginFrame)
            .map_err(LinkError::from)
            .and_then(|_| body(self));
        let end = self.transport.handle(TransportMessage::EndFrame).map_err(LinkError::from);
        let release = self.set_pin(PinRole::ChipSelect, false);

        let value = result?;
        end?;
        release?;
        Ok(value)
    }

    /// Instruction bytes, one frame each, paced for the controller
    pub fn command(&mut self, commands: &[u8]) -> Result<(), LinkError> {
        self.transport.handle(TransportMessage::SetDataMode(false))?;
        for &c in commands {
            self.transport.handle(TransportMessage::Send(&encode(SYNC_COMMAND, &[c])))?;
            self.delay(COMMAND_DELAY)?;
        }
        Ok(())
    }

    /// Display RAM bytes in a single frame
    pub fn data(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.transport.handle(TransportMessage::SetDataMode(true))?;
        self.transport.handle(TransportMessage::Send(&encode(SYNC_DATA, bytes)))?;
        Ok(())
    }
}

fn collect_u8(format: DataFormat<'_>) -> Result<Vec<u8>, InterfaceError> {
    match format {
        DataFormat::U8(bytes) => Ok(bytes.to_vec()),
        DataFormat::U8Iter(iter) => Ok(iter.collect()),
        _ => Err(InterfaceError::DataFormatNotImplemented),
    }
}

// lets display-interface based drivers share the link
impl<T: ByteLink, C: ControlLink> WriteOnlyDataCommand for St7920Interface<T, C> {
    fn send_commands(&mut self, cmd: DataFormat<'_>) -> Result<(), InterfaceError> {
        let bytes = collect_u8(cmd)?;
        self.transaction(|i| i.command(&bytes)).map_err(|e| {
            warn!("ST7920 command write failed: {}", e);
            InterfaceError::BusWriteError
        })
    }

    fn send_data(&mut self, buf: DataFormat<'_>) -> Result<(), InterfaceError> {
        let bytes = collect_u8(buf)?;
        self.transaction(|i| i.data(&bytes)).map_err(|e| {
            warn!("ST7920 data write failed: {}", e);
            InterfaceError::BusWriteError
        })
    }
}

/// GDRAM (vertical, horizontal word) address of framebuffer row `y`
fn row_address(y: usize, width: usize) -> (u8, u8) {
    if y < GDRAM_ROWS {
        (y as u8, 0)
    } else {
        ((y - GDRAM_ROWS) as u8, (width / 16) as u8)
    }
}

/// ST7920 driver with a full-frame buffer
pub struct St7920Driver<T: ByteLink, C: ControlLink> {
    interface: St7920Interface<T, C>,
    framebuffer: MonoFrameBuffer,
    capabilities: DisplayCapabilities,
}

impl<T: ByteLink, C: ControlLink> St7920Driver<T, C> {
    /// Panels are 128x64 or 192x32
    pub fn new(interface: St7920Interface<T, C>, width: u32, height: u32) -> Result<Self, DisplayError> {
        match (width, height) {
            (128, 64) | (192, 32) => {}
            _ => {
                return Err(DisplayError::InvalidConfiguration(
                    format!("ST7920 supports 128x64 or 192x32, got {}x{}", width, height)
                ));
            }
        }

        let capabilities = DisplayCapabilities {
            width,
            height,
            max_fps: 2, // 100 kHz serial: a full frame is ~200ms
            supports_power_save: true,
        };

        Ok(Self {
            interface,
            framebuffer: MonoFrameBuffer::new(width, height),
            capabilities,
        })
    }

    pub fn interface_mut(&mut self) -> &mut St7920Interface<T, C> {
        &mut self.interface
    }

    /// Current level of a menu button, false when not wired
    pub fn menu_input(&mut self, role: InputRole) -> Result<bool, DisplayError> {
        Ok(self.interface.query(role)?)
    }
}

impl<T, C> DisplayDriver for St7920Driver<T, C>
where
    T: ByteLink + Send,
    C: ControlLink + Send,
{
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.interface.init_link()?;
        self.interface.reset()?;
        self.interface.transaction(|i| {
            i.delay(DelayUnit::Millis(100))?;
            i.command(&INIT_BASIC)?;
            i.delay(CLEAR_DELAY)?;
            i.command(&INIT_GRAPHICS)?;
            i.delay(DelayUnit::Millis(10))
        })?;
        info!("ST7920 initialized ({}x{})", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<(), DisplayError> {
        let display = if enabled { DISPLAY_OFF } else { DISPLAY_ON };
        self.interface.transaction(|i| {
            i.command(&[FUNCTION_SET_BASIC, display, EXTENDED_GRAPHICS])
        })?;
        debug!("ST7920 power save {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let framebuffer = &self.framebuffer;
        let width = framebuffer.width();
        self.interface.transaction(|i| {
            for y in 0..framebuffer.height() {
                let Some(row) = framebuffer.row(y) else { break };
                let (vertical, horizontal) = row_address(y, width);
                i.command(&[SET_GDRAM_ADDRESS | vertical, SET_GDRAM_ADDRESS | horizontal])?;
                i.data(row)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.framebuffer.clear_color(embedded_graphics::pixelcolor::BinaryColor::Off);
        self.flush()
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        if !self.framebuffer.load(buffer) {
            return Err(DisplayError::BufferSizeMismatch {
                expected: self.framebuffer.as_bytes().len(),
                actual: buffer.len(),
            });
        }
        self.flush()
    }

    fn framebuffer_mut(&mut self) -> &mut MonoFrameBuffer {
        &mut self.framebuffer
    }
}
