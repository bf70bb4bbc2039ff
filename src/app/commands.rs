//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (buttons via
//! the service itself, a serial console, tests) that the
//! [`FeederService`](super::service::FeederService) interprets.

use crate::config::FeedingMode;
use crate::gsm::Priority;
use crate::gsm::queue::{Recipient, SmsBody};

/// Commands that adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Dispense the current mode's minimum portion now.
    ManualFeed,

    /// Switch Cat <-> Dog.
    ToggleMode,
    SetMode(FeedingMode),

    /// Turn the auto-feed policy on or off.
    SetAutoFeed(bool),

    /// Stop the motor immediately and latch the fault.
    EmergencyStop,

    /// Clear latched faults (emergency stop, feeding timeout).
    ClearFaults,

    /// Queue a low-priority status SMS to the alert recipient.
    SendStatus,

    /// Queue an arbitrary SMS.  The recipient is normalised first.
    SendSms {
        recipient: Recipient,
        body: SmsBody,
        priority: Priority,
    },
}
