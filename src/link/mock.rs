/*
 *  link/mock.rs
 *
 *  st7920-link
 *  (c) 2020-26 Stuart Hunter
 *
 *  Recording bus, GPIO and delay doubles for running without hardware
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

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};

use crate::link::error::{GpioError, TransportError};
use crate::link::gpio::GpioBackend;
use crate::link::transport::{BusOpener, BusSettings};

/// Events kept before the oldest half is dropped
const DEFAULT_CAPACITY: usize = 65_536;

/// One observable hardware action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened { bus_index: u8, channel: u8, speed_hz: u32 },
    Transfer(Vec<u8>),
    Claimed { line: u32, output: bool },
    Pin { line: u32, level: bool },
    Delay(Duration),
}

/// Shared, ordered record of everything the doubles were asked to do
#[derive(Debug)]
pub struct TrafficLog {
    events: Vec<LinkEvent>,
    capacity: usize,
    bytes_sent: usize,
    transfer_count: usize,
    inputs: HashMap<u32, bool>,

    /// Simulate failures (for error testing)
    pub simulate_transfer_failure: bool,
}

impl Default for TrafficLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TrafficLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(2),
            bytes_sent: 0,
            transfer_count: 0,
            inputs: HashMap::new(),
            simulate_transfer_failure: false,
        }
    }

    fn record(&mut self, event: LinkEvent) {
        if self.events.len() >= self.capacity {
            let half = self.capacity / 2;
            self.events.drain(..half);
        }
        if let LinkEvent::Transfer(bytes) = &event {
            self.bytes_sent += bytes.len();
            self.transfer_count += 1;
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[LinkEvent] {
        &self.events
    }

    /// Forget recorded events; counters keep running
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Payloads of the recorded transfers, in order
    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Transfer(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total bytes written since creation
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    pub fn transfer_count(&self) -> usize {
        self.transfer_count
    }

    /// Sum of the recorded delays
    pub fn total_delay(&self) -> Duration {
        self.events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Delay(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    pub fn set_input_level(&mut self, line: u32, level: bool) {
        self.inputs.insert(line, level);
    }

    fn input_level(&self, line: u32) -> bool {
        self.inputs.get(&line).copied().unwrap_or(false)
    }
}

pub type SharedLog = Arc<Mutex<TrafficLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, TrafficLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bus opener that hands out `MockSpi` devices
#[derive(Debug, Clone)]
pub struct MockBus {
    log: SharedLog,
    available: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::with_log(Arc::new(Mutex::new(TrafficLog::default())))
    }

    pub fn with_log(log: SharedLog) -> Self {
        Self { log, available: true }
    }

    /// A bus whose device node cannot be opened
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.log)
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusOpener for MockBus {
    type Device = MockSpi;

    fn open(&mut self, settings: &BusSettings) -> Result<MockSpi, TransportError> {
        if !self.available {
            return Err(TransportError::OpenFailed(format!(
                "{}: No such file or directory",
                settings.device_path()
            )));
        }
        lock(&self.log).record(LinkEvent::Opened {
            bus_index: settings.bus_index,
            channel: settings.channel,
            speed_hz: settings.speed_hz,
        });
        Ok(MockSpi { log: Arc::clone(&self.log) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSpiError;

impl spi::Error for MockSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// SPI device that records every written byte
#[derive(Debug)]
pub struct MockSpi {
    log: SharedLog,
}

impl spi::ErrorType for MockSpi {
    type Error = MockSpiError;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut log = lock(&self.log);
        if log.simulate_transfer_failure {
            return Err(MockSpiError);
        }
        for op in operations {
            match op {
                Operation::Write(buf) => log.record(LinkEvent::Transfer(buf.to_vec())),
                Operation::Transfer(read, write) => {
                    log.record(LinkEvent::Transfer(write.to_vec()));
                    read.fill(0);
                }
                Operation::TransferInPlace(buf) => {
                    log.record(LinkEvent::Transfer(buf.to_vec()));
                    buf.fill(0);
                }
                Operation::Read(buf) => buf.fill(0),
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// GPIO backend whose lines record into the shared log
#[derive(Debug, Clone)]
pub struct MockGpio {
    log: SharedLog,
    available: bool,
    failing: HashSet<u32>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::with_log(Arc::new(Mutex::new(TrafficLog::default())))
    }

    pub fn with_log(log: SharedLog) -> Self {
        Self { log, available: true, failing: HashSet::new() }
    }

    /// A GPIO chip that cannot be opened
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    /// Refuse requests for one line (already claimed by someone else)
    pub fn failing_line(mut self, line: u32) -> Self {
        self.failing.insert(line);
        self
    }

    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.log)
    }

    fn check(&self, line: u32) -> Result<(), GpioError> {
        if !self.available {
            return Err(GpioError::SetupFailed("opening /dev/gpiochip0: No such file or directory".into()));
        }
        if self.failing.contains(&line) {
            return Err(GpioError::SetupFailed(format!("requesting line {}: Device or resource busy", line)));
        }
        Ok(())
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBackend for MockGpio {
    type Output = MockPin;
    type Input = MockInput;

    fn claim_output(&mut self, line: u32, _initial: bool) -> Result<MockPin, GpioError> {
        self.check(line)?;
        lock(&self.log).record(LinkEvent::Claimed { line, output: true });
        Ok(MockPin { line, log: Arc::clone(&self.log) })
    }

    fn claim_input(&mut self, line: u32) -> Result<MockInput, GpioError> {
        self.check(line)?;
        lock(&self.log).record(LinkEvent::Claimed { line, output: false });
        Ok(MockInput { line, log: Arc::clone(&self.log) })
    }
}

#[derive(Debug)]
pub struct MockPin {
    line: u32,
    log: SharedLog,
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        lock(&self.log).record(LinkEvent::Pin { line: self.line, level: false });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        lock(&self.log).record(LinkEvent::Pin { line: self.line, level: true });
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockInput {
    line: u32,
    log: SharedLog,
}

impl digital::ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(lock(&self.log).input_level(self.line))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!lock(&self.log).input_level(self.line))
    }
}

/// Delay that records the requested time instead of sleeping
#[derive(Debug, Clone)]
pub struct RecordingDelay {
    log: SharedLog,
}

impl RecordingDelay {
    pub fn new(log: SharedLog) -> Self {
        Self { log }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        lock(&self.log).record(LinkEvent::Delay(Duration::from_nanos(u64::from(ns))));
    }

    fn delay_us(&mut self, us: u32) {
        lock(&self.log).record(LinkEvent::Delay(Duration::from_micros(u64::from(us))));
    }

    fn delay_ms(&mut self, ms: u32) {
        lock(&self.log).record(LinkEvent::Delay(Duration::from_millis(u64::from(ms))));
    }
}
