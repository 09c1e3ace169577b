/*
 *  link/gpio.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  GPIO and timing adapter - control lines, delays and menu inputs
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

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use linux_embedded_hal::CdevPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use log::{debug, info, trace, warn};

use crate::link::error::GpioError;
use crate::link::message::{ControlLink, DelayUnit, GpioMessage, GpioReply, InputRole, PinRole, INPUT_DEFAULT};

pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
/// BCM numbering, as wired on the Raspberry Pi header
pub const DEFAULT_CS_PIN: u32 = 7;
pub const DEFAULT_RESET_PIN: u32 = 2;

const CONSUMER: &str = "st7920-link";

/// Optional menu button lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuLines {
    pub select: Option<u32>,
    pub next: Option<u32>,
    pub prev: Option<u32>,
    pub home: Option<u32>,
}

impl MenuLines {
    pub fn line(&self, role: InputRole) -> Option<u32> {
        match role {
            InputRole::MenuSelect => self.select,
            InputRole::MenuNext => self.next,
            InputRole::MenuPrev => self.prev,
            InputRole::MenuHome => self.home,
        }
    }
}

/// Physical line offsets for each wired role. Fixed for the life of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub cs_pin: u32,
    pub reset_pin: u32,
    pub menu: MenuLines,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            cs_pin: DEFAULT_CS_PIN,
            reset_pin: DEFAULT_RESET_PIN,
            menu: MenuLines::default(),
        }
    }
}

/// Hands out configured lines. Implemented for GPIO character devices and by
/// the test doubles.
pub trait GpioBackend {
    type Output: OutputPin;
    type Input: InputPin;

    fn claim_output(&mut self, line: u32, initial: bool) -> Result<Self::Output, GpioError>;

    fn claim_input(&mut self, line: u32) -> Result<Self::Input, GpioError>;
}

/// Lines requested from `/dev/gpiochipN`; the chip is opened on first claim
pub struct CdevBackend {
    path: String,
    chip: Option<Chip>,
}

impl CdevBackend {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), chip: None }
    }

    fn chip(&mut self) -> Result<&mut Chip, GpioError> {
        if self.chip.is_none() {
            let chip = Chip::new(&self.path)
                .map_err(|e| GpioError::SetupFailed(format!("opening {}: {}", self.path, e)))?;
            info!("Opened GPIO chip {}", self.path);
            self.chip = Some(chip);
        }
        self.chip.as_mut()
            .ok_or_else(|| GpioError::SetupFailed(format!("{} unavailable", self.path)))
    }

    fn request(&mut self, line: u32, flags: LineRequestFlags, default: u8) -> Result<CdevPin, GpioError> {
        let handle = self.chip()?
            .get_line(line)
            .and_then(|l| l.request(flags, default, CONSUMER))
            .map_err(|e| GpioError::SetupFailed(format!("requesting line {}: {}", line, e)))?;
        CdevPin::new(handle)
            .map_err(|e| GpioError::SetupFailed(format!("line {}: {}", line, e)))
    }
}

impl GpioBackend for CdevBackend {
    type Output = CdevPin;
    type Input = CdevPin;

    fn claim_output(&mut self, line: u32, initial: bool) -> Result<CdevPin, GpioError> {
        self.request(line, LineRequestFlags::OUTPUT, u8::from(initial))
    }

    fn claim_input(&mut self, line: u32) -> Result<CdevPin, GpioError> {
        self.request(line, LineRequestFlags::INPUT, 0)
    }
}

struct ClaimedLines<G: GpioBackend> {
    chip_select: G::Output,
    reset: G::Output,
    menu: Vec<(InputRole, G::Input)>,
}

/// GPIO/timing adapter for the hardware SPI target
///
/// Only chip-select and reset are driven. Every other `PinRole` is accepted
/// and ignored because spidev owns the clock and data lines; a parallel or
/// I2C target would have to drive them here.
pub struct GpioAdapter<G: GpioBackend, D: DelayNs> {
    backend: G,
    delay: D,
    pins: PinAssignment,
    lines: Option<ClaimedLines<G>>,
}

impl<G: GpioBackend, D: DelayNs> GpioAdapter<G, D> {
    pub fn new(backend: G, delay: D, pins: PinAssignment) -> Self {
        Self {
            backend,
            delay,
            pins,
            lines: None,
        }
    }

    pub fn pins(&self) -> &PinAssignment {
        &self.pins
    }

    pub fn is_initialized(&self) -> bool {
        self.lines.is_some()
    }

    /// Claim chip-select and reset as outputs, wired menu lines as inputs.
    ///
    /// Nothing is kept unless every line was claimed.
    pub fn initialize_gpio(&mut self) -> Result<(), GpioError> {
        if self.lines.is_some() {
            debug!("GPIO already initialized");
            return Ok(());
        }

        // chip-select idles deasserted (ST7920 CS is active high), reset idles released
        let chip_select = self.backend.claim_output(self.pins.cs_pin, false)?;
        let reset = self.backend.claim_output(self.pins.reset_pin, true)?;

        let mut menu = Vec::new();
        for role in InputRole::ALL {
            if let Some(line) = self.pins.menu.line(role) {
                menu.push((role, self.backend.claim_input(line)?));
            }
        }

        info!("GPIO ready: cs={} reset={} menu inputs={}",
              self.pins.cs_pin, self.pins.reset_pin, menu.len());
        self.lines = Some(ClaimedLines { chip_select, reset, menu });
        Ok(())
    }

    /// Drive a control line. Never fails; see the type docs for unwired roles.
    pub fn write_pin(&mut self, role: PinRole, level: bool) {
        let Some(lines) = self.lines.as_mut() else {
            debug!("GPIO write {:?}={} before init, ignored", role, level);
            return;
        };

        let pin = match role {
            PinRole::ChipSelect => &mut lines.chip_select,
            PinRole::Reset => &mut lines.reset,
            other => {
                trace!("{:?} is not wired on hardware SPI", other);
                return;
            }
        };

        if let Err(e) = pin.set_state(PinState::from(level)) {
            warn!("GPIO write {:?}={} failed: {:?}", role, level, e);
        }
    }

    /// Block for at least `duration`
    pub fn delay(&mut self, duration: Duration) {
        let mut remaining = duration;
        while remaining >= Duration::from_millis(1) {
            let ms = u32::try_from(remaining.as_millis()).unwrap_or(u32::MAX);
            self.delay.delay_ms(ms);
            remaining -= Duration::from_millis(u64::from(ms));
        }
        // under a millisecond left, fits in u32
        let ns = remaining.subsec_nanos();
        if ns > 0 {
            self.delay.delay_ns(ns);
        }
    }

    pub fn delay_units(&mut self, unit: DelayUnit) {
        self.delay(unit.to_duration());
    }

    /// Level of a wired menu input, `INPUT_DEFAULT` when the role has no line
    pub fn query_input_pin(&mut self, role: InputRole) -> bool {
        let Some(lines) = self.lines.as_mut() else {
            return INPUT_DEFAULT;
        };
        match lines.menu.iter_mut().find(|(r, _)| *r == role) {
            Some((_, pin)) => pin.is_high().unwrap_or_else(|e| {
                warn!("GPIO read {:?} failed: {:?}", role, e);
                INPUT_DEFAULT
            }),
            None => INPUT_DEFAULT,
        }
    }
}

impl<G: GpioBackend, D: DelayNs> ControlLink for GpioAdapter<G, D> {
    fn handle(&mut self, msg: GpioMessage) -> Result<GpioReply, GpioError> {
        match msg {
            GpioMessage::Init => self.initialize_gpio().map(|_| GpioReply::Done),
            GpioMessage::Delay(unit) => {
                self.delay_units(unit);
                Ok(GpioReply::Done)
            }
            GpioMessage::Write(role, level) => {
                self.write_pin(role, level);
                Ok(GpioReply::Done)
            }
            GpioMessage::Query(role) => Ok(GpioReply::Level(self.query_input_pin(role))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mock::{LinkEvent, MockGpio, RecordingDelay};
    use linux_embedded_hal::Delay;
    use std::time::Instant;

    fn pins() -> PinAssignment {
        PinAssignment { cs_pin: 7, reset_pin: 2, menu: MenuLines::default() }
    }

    #[test]
    fn init_claims_cs_and_reset() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());

        adapter.initialize_gpio().unwrap();
        assert!(adapter.is_initialized());

        let log = log.lock().unwrap();
        assert_eq!(log.events(), &[
            LinkEvent::Claimed { line: 7, output: true },
            LinkEvent::Claimed { line: 2, output: true },
        ]);
    }

    #[test]
    fn setup_failure_keeps_adapter_uninitialized() {
        let gpio = MockGpio::unavailable();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log), pins());

        assert!(matches!(adapter.initialize_gpio(), Err(GpioError::SetupFailed(_))));
        assert!(!adapter.is_initialized());
    }

    #[test]
    fn failed_menu_claim_discards_the_outputs() {
        let gpio = MockGpio::new().failing_line(21);
        let log = gpio.log();
        let assignment = PinAssignment {
            menu: MenuLines { next: Some(21), ..Default::default() },
            ..pins()
        };
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log), assignment);

        assert!(adapter.initialize_gpio().is_err());
        assert!(!adapter.is_initialized());
    }

    #[test]
    fn writes_drive_cs_and_reset() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());
        adapter.initialize_gpio().unwrap();
        log.lock().unwrap().clear();

        adapter.write_pin(PinRole::ChipSelect, true);
        adapter.write_pin(PinRole::Reset, false);
        adapter.write_pin(PinRole::ChipSelect, false);

        assert_eq!(log.lock().unwrap().events(), &[
            LinkEvent::Pin { line: 7, level: true },
            LinkEvent::Pin { line: 2, level: false },
            LinkEvent::Pin { line: 7, level: false },
        ]);
    }

    #[test]
    fn unwired_roles_are_silent_no_ops() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());
        adapter.initialize_gpio().unwrap();
        log.lock().unwrap().clear();

        let roles = [
            PinRole::SpiClock,
            PinRole::SpiData,
            PinRole::Data(2),
            PinRole::Data(7),
            PinRole::Enable,
            PinRole::DataCommand,
            PinRole::ChipSelect1,
            PinRole::ChipSelect2,
            PinRole::I2cClock,
            PinRole::I2cData,
        ];
        for role in roles {
            for level in [true, false, true] {
                let reply = ControlLink::handle(&mut adapter, GpioMessage::Write(role, level)).unwrap();
                assert_eq!(reply, GpioReply::Done);
            }
        }

        assert!(log.lock().unwrap().events().is_empty());
    }

    #[test]
    fn writes_before_init_are_ignored() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());

        adapter.write_pin(PinRole::ChipSelect, true);
        assert!(log.lock().unwrap().events().is_empty());
    }

    #[test]
    fn unwired_inputs_read_the_default() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log), pins());

        for _ in 0..3 {
            for role in InputRole::ALL {
                assert_eq!(adapter.query_input_pin(role), INPUT_DEFAULT);
            }
        }
        adapter.initialize_gpio().unwrap();
        for _ in 0..3 {
            for role in InputRole::ALL {
                let reply = ControlLink::handle(&mut adapter, GpioMessage::Query(role)).unwrap();
                assert_eq!(reply, GpioReply::Level(false));
            }
        }
    }

    #[test]
    fn wired_inputs_report_their_level() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let assignment = PinAssignment {
            menu: MenuLines { select: Some(17), home: Some(27), ..Default::default() },
            ..pins()
        };
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), assignment);
        adapter.initialize_gpio().unwrap();

        log.lock().unwrap().set_input_level(17, true);
        assert!(adapter.query_input_pin(InputRole::MenuSelect));
        assert!(!adapter.query_input_pin(InputRole::MenuHome));
        assert!(!adapter.query_input_pin(InputRole::MenuNext));

        log.lock().unwrap().set_input_level(17, false);
        assert!(!adapter.query_input_pin(InputRole::MenuSelect));
    }

    #[test]
    fn delays_are_scaled_before_sleeping() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());

        ControlLink::handle(&mut adapter, GpioMessage::Delay(DelayUnit::TenMicros(5))).unwrap();
        ControlLink::handle(&mut adapter, GpioMessage::Delay(DelayUnit::Millis(3))).unwrap();
        ControlLink::handle(&mut adapter, GpioMessage::Delay(DelayUnit::HundredNanos(4))).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.total_delay(), Duration::from_micros(50) + Duration::from_millis(3) + Duration::from_nanos(400));
        assert_eq!(log.events()[0], LinkEvent::Delay(Duration::from_micros(50)));
        assert_eq!(log.events()[1], LinkEvent::Delay(Duration::from_millis(3)));
    }

    #[test]
    fn mixed_durations_split_into_millis_and_nanos() {
        let gpio = MockGpio::new();
        let log = gpio.log();
        let mut adapter = GpioAdapter::new(gpio, RecordingDelay::new(log.clone()), pins());

        adapter.delay(Duration::from_micros(2_500));

        let log = log.lock().unwrap();
        assert_eq!(log.events(), &[
            LinkEvent::Delay(Duration::from_millis(2)),
            LinkEvent::Delay(Duration::from_micros(500)),
        ]);
    }

    #[test]
    fn real_delay_never_returns_early() {
        let mut adapter = GpioAdapter::new(MockGpio::new(), Delay {}, pins());

        for unit in [
            DelayUnit::Nanos(500),
            DelayUnit::HundredNanos(20),
            DelayUnit::TenMicros(5),
            DelayUnit::Millis(3),
        ] {
            let start = Instant::now();
            adapter.delay_units(unit);
            assert!(start.elapsed() >= unit.to_duration(), "{:?} returned early", unit);
        }
    }
}
