//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the button pins, the stepper driver, the buzzer, the I2C bus and
//! the clock, and exposes them as one [`FeederHardware`] bundle.  This is
//! the only module in the system that touches actual hardware.  Every
//! peripheral is an `embedded-hal` 1.0 trait object, so the same adapter
//! runs over `esp-idf-hal` drivers on target and over mocks on the host.
//!
//! [`FeederHardware`]: crate::app::ports::FeederHardware

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use log::warn;

use crate::app::ports::{
    BusError, BuzzerPort, DistanceBus, Input, InputPort, MotorPort, TimePort, Tone,
};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<FB, MB, I2C, M, BZ, CLK> {
    feed_button: FB,
    mode_button: MB,
    i2c: I2C,
    motor: M,
    buzzer: BZ,
    clock: CLK,
    bus_resets: u32,
}

impl<FB, MB, I2C, M, BZ, CLK> HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    FB: InputPin,
    MB: InputPin,
    I2C: I2c,
    M: MotorPort,
    BZ: BuzzerPort,
    CLK: TimePort + DelayNs,
{
    pub fn new(feed_button: FB, mode_button: MB, i2c: I2C, motor: M, buzzer: BZ, clock: CLK) -> Self {
        Self {
            feed_button,
            mode_button,
            i2c,
            motor,
            buzzer,
            clock,
            bus_resets: 0,
        }
    }

    /// How many times the sensor reader asked for a bus reset.
    pub fn bus_resets(&self) -> u32 {
        self.bus_resets
    }
}

// ── InputPort ─────────────────────────────────────────────────

impl<FB, MB, I2C, M, BZ, CLK> InputPort for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    FB: InputPin,
    MB: InputPin,
{
    fn read_level(&mut self, input: Input) -> bool {
        // An unreadable pin reads as released (pull-up idle level).
        match input {
            Input::FeedButton => self.feed_button.is_high().unwrap_or(true),
            Input::ModeButton => self.mode_button.is_high().unwrap_or(true),
        }
    }
}

// ── MotorPort ─────────────────────────────────────────────────

impl<FB, MB, I2C, M, BZ, CLK> MotorPort for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    M: MotorPort,
{
    fn enable(&mut self) {
        self.motor.enable();
    }

    fn disable(&mut self) {
        self.motor.disable();
    }

    fn set_direction(&mut self, forward: bool) {
        self.motor.set_direction(forward);
    }

    fn pulse(&mut self, period_us: u32) {
        self.motor.pulse(period_us);
    }
}

// ── BuzzerPort ────────────────────────────────────────────────

impl<FB, MB, I2C, M, BZ, CLK> BuzzerPort for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    BZ: BuzzerPort,
{
    fn play(&mut self, pattern: &[Tone]) {
        self.buzzer.play(pattern);
    }
}

// ── DistanceBus ───────────────────────────────────────────────

impl<FB, MB, I2C, M, BZ, CLK> DistanceBus for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    I2C: I2c,
{
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c.write(addr, bytes).map_err(|e| bus_error(e.kind()))
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        self.i2c
            .read(addr, buf)
            .map(|()| buf.len())
            .map_err(|e| bus_error(e.kind()))
    }

    fn reinit(&mut self) {
        // The ESP-IDF driver recovers a stuck bus on the next transaction.
        self.bus_resets = self.bus_resets.wrapping_add(1);
        warn!("I2C: bus reset requested ({} so far)", self.bus_resets);
    }
}

/// Map an `embedded-hal` I2C failure onto the sensor transport error.
pub fn bus_error(kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        ErrorKind::Bus | ErrorKind::ArbitrationLoss => BusError::Timeout,
        ErrorKind::Overrun => BusError::Other(1),
        _ => BusError::Other(0),
    }
}

// ── Clock ─────────────────────────────────────────────────────

impl<FB, MB, I2C, M, BZ, CLK> TimePort for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    CLK: TimePort,
{
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}

impl<FB, MB, I2C, M, BZ, CLK> DelayNs for HardwareAdapter<FB, MB, I2C, M, BZ, CLK>
where
    CLK: DelayNs,
{
    fn delay_ns(&mut self, ns: u32) {
        self.clock.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.delay_ms(ms);
    }
}
