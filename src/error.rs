//! Unified error types for the PetFeeder firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level error handling uniform.  All variants are `Copy` so they can be
//! passed through the scheduler, the policy machine and the event sink
//! without allocation.

use core::fmt;

use crate::app::ports::{BusError, ConfigError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The distance sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// A dispense request was rejected or aborted.
    Motor(MotorError),
    /// The cellular modem failed an exchange.
    Modem(ModemError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// A safety fault is latched.
    Safety(SafetyFault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Motor(e) => write!(f, "motor: {e}"),
            Self::Modem(e) => write!(f, "modem: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::ParseFailed => Self::Config("parse failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The boot-time probe never saw the sensor.
    NotInitialized,
    /// The I2C transport reported a failure (after the single retry).
    Bus(BusError),
    /// Fewer than the 3 frame bytes came back.
    ShortRead(usize),
    /// Decoded distance lies outside the physically plausible range.
    OutOfRange { distance_mm: u16 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "sensor not initialised"),
            Self::Bus(e) => write!(f, "bus error: {e}"),
            Self::ShortRead(n) => write!(f, "short read ({n} of 3 bytes)"),
            Self::OutOfRange { distance_mm } => {
                write!(f, "distance {distance_mm} mm out of range")
            }
        }
    }
}

impl From<BusError> for SensorError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Motor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// A dispense of zero steps was requested.
    InvalidPortion,
    /// Maximum step rate of zero.
    InvalidSpeed,
    /// A dispense is already running.
    Busy,
    /// A latched fault (emergency stop, feed timeout) blocks the motor.
    Faulted,
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPortion => write!(f, "invalid portion (0 steps)"),
            Self::InvalidSpeed => write!(f, "invalid speed (0 Hz)"),
            Self::Busy => write!(f, "dispense already in progress"),
            Self::Faulted => write!(f, "motor blocked by latched fault"),
        }
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Self::Motor(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Faults tracked by the safety supervisor.  Discriminants are bit masks
/// so several can be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Operator or ISR requested an emergency stop.
    EmergencyStop = 0b0000_0001,
    /// A dispense ran past the feeding timeout.
    FeedTimeout = 0b0000_0010,
    /// The distance sensor stopped answering.
    SensorOffline = 0b0000_0100,
}

impl SafetyFault {
    pub const ALL: [SafetyFault; 3] = [Self::EmergencyStop, Self::FeedTimeout, Self::SensorOffline];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Latched faults stay set until explicitly cleared; the others
    /// follow their condition.
    pub const fn is_latched(self) -> bool {
        matches!(self, Self::EmergencyStop | Self::FeedTimeout)
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmergencyStop => write!(f, "emergency stop"),
            Self::FeedTimeout => write!(f, "feeding timeout"),
            Self::SensorOffline => write!(f, "sensor offline"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Modem errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// The session is not in `SmsReady`.
    NotReady,
    /// The expected response did not arrive before the deadline.
    Timeout,
    /// The modem answered `ERROR`.
    ErrorResponse,
    /// The serial transport failed.
    Transport,
    /// The recipient or body does not fit the fixed-size buffers.
    MessageTooLong,
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "modem not ready"),
            Self::Timeout => write!(f, "response timeout"),
            Self::ErrorResponse => write!(f, "modem returned ERROR"),
            Self::Transport => write!(f, "serial transport failure"),
            Self::MessageTooLong => write!(f, "message too long"),
        }
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
