//! Outbound application events.
//!
//! The [`FeederService`](super::service::FeederService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, record in
//! a test, and so on.

use crate::config::FeedingMode;
use crate::control::motion::FeedKind;
use crate::error::{ModemError, MotorError, SafetyFault, SensorError};
use crate::gsm::queue::Admission;
use crate::gsm::{ModemStatus, Priority};

use super::service::SystemState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service finished its boot sequence.
    Started { mode: FeedingMode, sensor_online: bool },

    /// The derived system state changed.
    SystemStateChanged { from: SystemState, to: SystemState },

    ModeChanged(FeedingMode),
    AutoFeedToggled(bool),

    // -- Levels --
    BowlEmpty { distance_cm: f32 },
    BowlFilled { distance_cm: f32 },
    HopperLow { distance_cm: f32 },
    HopperRefilled { distance_cm: f32 },
    /// The bowl stayed empty for the whole confirmation window.
    EmptyConfirmed,
    SensorFailed(SensorError),

    // -- Dispensing --
    FeedStarted { kind: FeedKind, steps: u32, grams: f32 },
    FeedCompleted { kind: FeedKind, steps: u32 },
    FeedAborted { kind: FeedKind, done: u32, total: u32 },
    FeedRejected { kind: FeedKind, reason: MotorError },

    // -- Auto-feed policy --
    DailyReset,
    QuotaExhausted { fed_today: u32, max_daily: u32 },

    // -- SMS / modem --
    SmsQueued { priority: Priority, admission: Admission },
    SmsSent(Priority),
    SmsFailed { priority: Priority, error: ModemError },
    ModemStatusChanged { from: ModemStatus, to: ModemStatus },

    // -- Safety --
    FaultRaised(SafetyFault),
    FaultCleared(SafetyFault),
    EmergencyStop,

    /// Periodic status snapshot.
    Status(StatusReport),
}

/// A point-in-time status snapshot suitable for logging or an SMS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub state: SystemState,
    pub mode: FeedingMode,
    pub auto_feed: bool,
    pub fed_today: u32,
    pub max_daily: u32,
    /// Last valid distance reading.
    pub distance_cm: Option<f32>,
    pub bowl_empty: bool,
    pub hopper_low: bool,
    pub sensor_online: bool,
    pub modem: ModemStatus,
    pub sms_pending: usize,
    pub fault_flags: u8,
}
