//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeederService (domain)
//! ```
//!
//! Driven adapters (buttons, stepper, buzzer, I2C sensor bus, modem UART,
//! event sinks) implement these traits.  The
//! [`FeederService`](super::service::FeederService) consumes them via
//! generics, so the domain core never touches hardware directly and every
//! path can be exercised on the host with recording mocks.
//!
//! Busy waits go through [`embedded_hal::delay::DelayNs`] rather than a
//! bespoke trait.

use embedded_hal::delay::DelayNs;

use crate::error::ModemError;
use crate::gsm::ModemStatus;

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond counter.  Wraps at `u32::MAX`; consumers only
/// ever use [`crate::time::elapsed_ms`] on it.
pub trait TimePort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Digital inputs (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Physical inputs sampled every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    FeedButton,
    ModeButton,
}

/// Read-side port for raw digital levels.  `true` = HIGH (released, with
/// the pull-up wiring used on the board).
pub trait InputPort {
    fn read_level(&mut self, input: Input) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Motor output (driven adapter: domain → stepper driver)
// ───────────────────────────────────────────────────────────────

/// Step/direction/enable interface of the stepper driver.
///
/// Implementations own the electrical timing: `enable` includes the
/// driver energise delay, `set_direction` the direction setup time, and
/// `pulse` a full step period (high pulse plus the remaining low time).
pub trait MotorPort {
    fn enable(&mut self);
    fn disable(&mut self);
    fn set_direction(&mut self, forward: bool);
    /// Emit one step pulse and wait out the rest of `period_us`.
    fn pulse(&mut self, period_us: u32);
}

// ───────────────────────────────────────────────────────────────
// Buzzer
// ───────────────────────────────────────────────────────────────

/// One beep of a tone pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub freq_hz: u32,
    pub duration_ms: u32,
    /// Silence after the beep.
    pub gap_ms: u32,
}

/// Blocking tone playback (patterns are a few hundred ms at most).
pub trait BuzzerPort {
    fn play(&mut self, pattern: &[Tone]);
}

// ───────────────────────────────────────────────────────────────
// Distance sensor transport (I2C)
// ───────────────────────────────────────────────────────────────

/// Transport errors reported by the sensor bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The bus timed out; the reader re-initialises and retries once.
    Timeout,
    /// Address or data byte not acknowledged.
    Nack,
    /// Any other bus failure, with the platform error code.
    Other(i32),
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Nack => write!(f, "no acknowledge"),
            Self::Other(code) => write!(f, "bus error {}", code),
        }
    }
}

/// Byte-level access to the distance sensor.
pub trait DistanceBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError>;
    /// Read into `buf`; returns how many bytes actually arrived.
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, BusError>;
    /// Re-initialise the bus after a timeout.
    fn reinit(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Modem serial transport
// ───────────────────────────────────────────────────────────────

/// Byte transport to the cellular modem.  Reads are non-blocking; the
/// AT layer owns every timeout.
pub trait ModemTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ModemError>;
    /// Copy whatever is buffered into `buf` without waiting.
    fn read(&mut self, buf: &mut [u8]) -> usize;
    /// Pulse the modem reset line and wait for it to boot.
    fn reset(&mut self);

    /// Discard stale input before a new command.
    fn clear_input(&mut self) {
        let mut scratch = [0u8; 32];
        while self.read(&mut scratch) > 0 {}
    }
}

// ───────────────────────────────────────────────────────────────
// SMS link (driven adapter: dispatcher → modem session)
// ───────────────────────────────────────────────────────────────

/// What the SMS dispatcher and the service need from the modem session.
pub trait SmsLink {
    /// Current session status.
    fn status(&self) -> ModemStatus;
    /// Advance the session state machine (at most one AT exchange).
    fn poll(&mut self, now_ms: u32) -> ModemStatus;
    /// Blocking send; only valid in [`ModemStatus::SmsReady`].
    fn send_sms(&mut self, recipient: &str, body: &str) -> Result<(), ModemError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Board bundle
// ───────────────────────────────────────────────────────────────

/// Everything the control loop touches on the board, as one bound.
/// Blanket-implemented, so adapters and mocks only implement the parts.
pub trait FeederHardware: TimePort + InputPort + MotorPort + BuzzerPort + DistanceBus + DelayNs {}

impl<T> FeederHardware for T where T: TimePort + InputPort + MotorPort + BuzzerPort + DistanceBus + DelayNs {}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Configuration override errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override is not valid JSON for [`SystemConfig`](crate::config::SystemConfig).
    ParseFailed,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ParseFailed => write!(f, "config parse failed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
