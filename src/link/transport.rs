/*
 *  link/transport.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  SPI transport adapter - byte sequences and framing onto a spidev bus
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

use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::SpidevDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use log::{debug, info, trace};

use crate::link::error::TransportError;
use crate::link::message::{ByteLink, TransportMessage};

/// Clock rate used when the configuration does not name one
pub const DEFAULT_SPEED_HZ: u32 = 100_000;

/// Which spidev node to open and how fast to clock it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    /// SPI controller index (`X` in `/dev/spidevX.Y`)
    pub bus_index: u8,
    /// Hardware chip-enable channel (`Y` in `/dev/spidevX.Y`)
    pub channel: u8,
    pub speed_hz: u32,
}

impl BusSettings {
    pub fn device_path(&self) -> String {
        format!("/dev/spidev{}.{}", self.bus_index, self.channel)
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            bus_index: 0,
            channel: 0,
            speed_hz: DEFAULT_SPEED_HZ,
        }
    }
}

/// Opens the platform bus. Implemented by spidev and by the test doubles.
pub trait BusOpener {
    type Device: SpiDevice;

    fn open(&mut self, settings: &BusSettings) -> Result<Self::Device, TransportError>;
}

/// Opens `/dev/spidevX.Y` in mode 0 with 8-bit words
#[derive(Debug, Default, Clone, Copy)]
pub struct SpidevOpener;

impl BusOpener for SpidevOpener {
    type Device = SpidevDevice;

    fn open(&mut self, settings: &BusSettings) -> Result<SpidevDevice, TransportError> {
        let path = settings.device_path();
        let mut spi = SpidevDevice::open(&path)
            .map_err(|e| TransportError::OpenFailed(format!("{}: {:?}", path, e)))?;

        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(settings.speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| TransportError::OpenFailed(format!("{}: configure: {:?}", path, e)))?;

        Ok(spi)
    }
}

/// The one opened bus of a session
#[derive(Debug)]
pub struct TransportHandle<D> {
    pub bus_index: u8,
    pub channel: u8,
    pub speed_hz: u32,
    device: D,
}

/// Transport adapter: hardware SPI, write-only
pub struct SpiTransport<B: BusOpener> {
    opener: B,
    settings: BusSettings,
    handle: Option<TransportHandle<B::Device>>,
}

impl<B: BusOpener> SpiTransport<B> {
    pub fn new(opener: B, settings: BusSettings) -> Self {
        Self {
            opener,
            settings,
            handle: None,
        }
    }

    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn transport_handle(&self) -> Option<&TransportHandle<B::Device>> {
        self.handle.as_ref()
    }

    /// Open the bus. A second call hands back the handle already open.
    ///
    /// On failure nothing is stored, the transport stays uninitialized.
    pub fn initialize(&mut self) -> Result<&TransportHandle<B::Device>, TransportError> {
        if self.handle.is_none() {
            let device = self.opener.open(&self.settings)?;
            info!("Opened SPI device {} at {} Hz", self.settings.device_path(), self.settings.speed_hz);
            self.handle = Some(TransportHandle {
                bus_index: self.settings.bus_index,
                channel: self.settings.channel,
                speed_hz: self.settings.speed_hz,
                device,
            });
        } else {
            debug!("SPI transport already initialized, reusing handle");
        }
        self.handle.as_ref().ok_or(TransportError::NotInitialized)
    }

    // spidev frames each write with the hardware chip-enable itself
    pub fn begin_frame(&mut self) {}

    pub fn end_frame(&mut self) {}

    // ST7920 serial mode carries command/data in the sync byte
    pub fn set_data_mode(&mut self, _is_data: bool) {}

    /// Blocking write of `bytes`; nothing is read back
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let handle = self.handle.as_mut().ok_or(TransportError::NotInitialized)?;
        trace!("spi write {} bytes", bytes.len());
        handle.device
            .write(bytes)
            .map_err(|e| TransportError::TransferFailed(format!("{:?}", e)))
    }
}

impl<B: BusOpener> ByteLink for SpiTransport<B> {
    fn handle(&mut self, msg: TransportMessage<'_>) -> Result<(), TransportError> {
        match msg {
            TransportMessage::Init => self.initialize().map(|_| ()),
            TransportMessage::SetDataMode(is_data) => {
                self.set_data_mode(is_data);
                Ok(())
            }
            TransportMessage::BeginFrame => {
                self.begin_frame();
                Ok(())
            }
            TransportMessage::Send(bytes) => self.send(bytes),
            TransportMessage::EndFrame => {
                self.end_frame();
                Ok(())
            }
        }
    }
}
