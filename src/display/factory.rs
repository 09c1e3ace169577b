/*
 *  display/factory.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds display drivers from configuration
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

use std::sync::{Arc, Mutex};

use linux_embedded_hal::Delay;
use log::info;

use crate::config::DisplayConfig;
use crate::display::drivers::st7920::{St7920Driver, St7920Interface};
use crate::display::error::{DisplayError, DisplayFactoryError};
use crate::display::traits::DisplayDriver;
use crate::link::mock::{MockBus, MockGpio, RecordingDelay, SharedLog, TrafficLog};
use crate::link::{BusSettings, CdevBackend, GpioAdapter, PinAssignment, SpiTransport, SpidevOpener};

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// ST7920 on spidev and the GPIO character device
pub type HardwareDriver = St7920Driver<SpiTransport<SpidevOpener>, GpioAdapter<CdevBackend, Delay>>;

/// ST7920 on the recording doubles
pub type EmulatedDriver = St7920Driver<SpiTransport<MockBus>, GpioAdapter<MockGpio, RecordingDelay>>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create a display driver from configuration
    ///
    /// Nothing touches the hardware here; devices are opened by `init()`.
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        let settings = config.to_bus_settings();
        let pins = config.to_pin_assignment();
        let (width, height) = config.geometry();

        if config.is_emulated() {
            info!("Emulation mode enabled - bus traffic is recorded, not sent");
            let (driver, _log) = emulated_driver(settings, pins, width, height)?;
            return Ok(Box::new(driver));
        }

        info!("ST7920 {}x{} on {} (cs={}, reset={}) via {}",
              width, height, settings.device_path(), pins.cs_pin, pins.reset_pin, config.gpio_chip());
        Ok(Box::new(hardware_driver(settings, pins, &config.gpio_chip(), width, height)?))
    }
}

pub fn hardware_driver(
    settings: BusSettings,
    pins: PinAssignment,
    gpio_chip: &str,
    width: u32,
    height: u32,
) -> Result<HardwareDriver, DisplayError> {
    let transport = SpiTransport::new(SpidevOpener, settings);
    let gpio = GpioAdapter::new(CdevBackend::new(gpio_chip), Delay {}, pins);
    St7920Driver::new(St7920Interface::new(transport, gpio), width, height)
}

/// Driver plus the log every double writes into
pub fn emulated_driver(
    settings: BusSettings,
    pins: PinAssignment,
    width: u32,
    height: u32,
) -> Result<(EmulatedDriver, SharedLog), DisplayError> {
    let log: SharedLog = Arc::new(Mutex::new(TrafficLog::default()));
    let transport = SpiTransport::new(MockBus::with_log(Arc::clone(&log)), settings);
    let gpio = GpioAdapter::new(
        MockGpio::with_log(Arc::clone(&log)),
        RecordingDelay::new(Arc::clone(&log)),
        pins,
    );
    let driver = St7920Driver::new(St7920Interface::new(transport, gpio), width, height)?;
    Ok((driver, log))
}
