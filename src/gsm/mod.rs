//! Cellular SMS alerting over a SIM800-class modem.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      SMS Stack                           │
//! │                                                          │
//! │  SmsAlert ──▶ SmsDispatcher ──▶ ModemSession ──▶ AT ──▶ UART
//! │  (template)   (queue + per-      (status FSM,   (scan for │
//! │                priority gates)    send_sms)     expected) │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Feeding never waits on the modem: alerts are queued, and the queue is
//! drained one message per tick once the session reports
//! [`ModemStatus::SmsReady`].

pub mod at;
pub mod dispatcher;
pub mod message;
pub mod queue;
pub mod session;

/// Modem session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModemStatus {
    #[default]
    Offline,
    Initializing,
    NetworkSearching,
    NetworkConnected,
    SmsReady,
    Error,
}

impl ModemStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Initializing => "INITIALIZING",
            Self::NetworkSearching => "NETWORK_SEARCHING",
            Self::NetworkConnected => "NETWORK_CONNECTED",
            Self::SmsReady => "SMS_READY",
            Self::Error => "ERROR",
        }
    }
}

/// SMS priority class.  Declaration order is urgency order, so
/// `High < Medium < Low` under `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// All classes, most urgent first.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn index(self) -> usize {
        self as usize
    }

    /// `true` if `self` is strictly more urgent than `other`.
    pub fn outranks(self, other: Priority) -> bool {
        self < other
    }
}
