// End-to-end checks of the link adapters and the ST7920 session over the
// recording doubles

use std::sync::{Arc, Mutex};
use std::time::Duration;

use st7920_link::display::factory::emulated_driver;
use st7920_link::display::{DisplayDriver, St7920Driver, St7920Interface};
use st7920_link::link::mock::{LinkEvent, MockBus, MockGpio, RecordingDelay, SharedLog, TrafficLog};
use st7920_link::link::{
    BusSettings, ByteLink, ControlLink, GpioAdapter, GpioMessage, GpioReply, InputRole, MenuLines,
    PinAssignment, PinRole, SpiTransport, TransportError, TransportMessage,
};

fn shared_log() -> SharedLog {
    Arc::new(Mutex::new(TrafficLog::default()))
}

fn adapters(log: &SharedLog, pins: PinAssignment)
    -> (SpiTransport<MockBus>, GpioAdapter<MockGpio, RecordingDelay>)
{
    let transport = SpiTransport::new(
        MockBus::with_log(Arc::clone(log)),
        BusSettings { bus_index: 0, channel: 0, speed_hz: 100_000 },
    );
    let gpio = GpioAdapter::new(
        MockGpio::with_log(Arc::clone(log)),
        RecordingDelay::new(Arc::clone(log)),
        pins,
    );
    (transport, gpio)
}

#[test]
fn one_framed_write_between_chip_select_edges() {
    let log = shared_log();
    let pins = PinAssignment { cs_pin: 7, reset_pin: 2, menu: MenuLines::default() };
    let (mut transport, mut gpio) = adapters(&log, pins);

    transport.handle(TransportMessage::Init).unwrap();
    gpio.handle(GpioMessage::Init).unwrap();
    log.lock().unwrap().clear();

    gpio.handle(GpioMessage::Write(PinRole::ChipSelect, true)).unwrap();
    transport.handle(TransportMessage::Send(&[0x3F, 0x01])).unwrap();
    gpio.handle(GpioMessage::Write(PinRole::ChipSelect, false)).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.events(), &[
        LinkEvent::Pin { line: 7, level: true },
        LinkEvent::Transfer(vec![0x3F, 0x01]),
        LinkEvent::Pin { line: 7, level: false },
    ]);
    assert_eq!(log.transfer_count(), 1);
}

#[test]
fn send_before_initialize_is_rejected() {
    let log = shared_log();
    let (mut transport, _gpio) = adapters(&log, PinAssignment::default());

    assert!(matches!(
        transport.handle(TransportMessage::Send(&[0x00])),
        Err(TransportError::NotInitialized)
    ));
    assert!(log.lock().unwrap().events().is_empty());
}

#[test]
fn unwired_roles_and_inputs_are_harmless() {
    let log = shared_log();
    let pins = PinAssignment {
        menu: MenuLines { select: Some(17), ..MenuLines::default() },
        ..PinAssignment::default()
    };
    let (_transport, mut gpio) = adapters(&log, pins);
    gpio.handle(GpioMessage::Init).unwrap();
    log.lock().unwrap().clear();

    gpio.handle(GpioMessage::Write(PinRole::SpiClock, true)).unwrap();
    gpio.handle(GpioMessage::Write(PinRole::Data(3), true)).unwrap();
    assert!(log.lock().unwrap().events().is_empty());

    log.lock().unwrap().set_input_level(17, true);
    assert_eq!(gpio.handle(GpioMessage::Query(InputRole::MenuSelect)).unwrap(), GpioReply::Level(true));
    assert_eq!(gpio.handle(GpioMessage::Query(InputRole::MenuHome)).unwrap(), GpioReply::Level(false));
}

#[test]
fn delays_are_at_least_as_long_as_requested() {
    let log = shared_log();
    let (_transport, mut gpio) = adapters(&log, PinAssignment::default());

    gpio.delay(Duration::from_micros(2_500));
    assert_eq!(log.lock().unwrap().total_delay(), Duration::from_micros(2_500));
}

#[test]
fn full_session_on_a_192x32_panel() {
    let (mut driver, log) = emulated_driver(BusSettings::default(), PinAssignment::default(), 192, 32).unwrap();

    driver.init().unwrap();
    driver.set_power_save(false).unwrap();
    log.lock().unwrap().clear();

    driver.write_buffer(&[0xAA; 24 * 32]).unwrap();

    let log = log.lock().unwrap();
    let transfers = log.transfers();
    assert_eq!(transfers.len(), 32 * 3);
    // never addresses the right half of GDRAM
    assert!(transfers.chunks(3).all(|row| row[1] == vec![0xF8, 0x80, 0x00]));
    assert_eq!(transfers[2].len(), 1 + 24 * 2);
    assert_eq!(&transfers[2][..3], &[0xFA, 0xA0, 0xA0]);
}

#[test]
fn gpio_failure_surfaces_as_setup_error() {
    let log = shared_log();
    let transport = SpiTransport::new(MockBus::with_log(Arc::clone(&log)), BusSettings::default());
    let gpio = GpioAdapter::new(
        MockGpio::with_log(Arc::clone(&log)).failing_line(2),
        RecordingDelay::new(Arc::clone(&log)),
        PinAssignment::default(),
    );
    let mut driver = St7920Driver::new(St7920Interface::new(transport, gpio), 128, 64).unwrap();

    let err = driver.init().unwrap_err();
    assert!(err.is_setup_failure());
    assert_eq!(log.lock().unwrap().transfer_count(), 0);
}
