//! Safety supervisor.
//!
//! Keeps the fault bitmask and decides what each fault blocks.
//!
//! ## Fault lifecycle
//!
//! * `EmergencyStop` and `FeedTimeout` are **latched**: once raised they
//!   stay set until a `ClearFaults` command, and while set no dispense of
//!   any kind may start.
//! * `SensorOffline` follows the sensor: raised after the configured run
//!   of failed reads, cleared by the next good read.  It suspends the
//!   auto-feed policy only; a manual feed is still allowed.
//!
//! Several faults can be active at once.

use log::{error, info};

use crate::config::SystemConfig;
use crate::error::SafetyFault;

/// Mask of the faults that only an explicit clear removes.
const LATCHED_MASK: u8 = SafetyFault::EmergencyStop.mask() | SafetyFault::FeedTimeout.mask();

pub struct SafetySupervisor {
    feeding_timeout_ms: u32,
    faults: u8,
}

impl SafetySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            feeding_timeout_ms: config.feeding_timeout_ms,
            faults: 0,
        }
    }

    /// Set a fault.  Returns `true` if it was not already active.
    pub fn raise(&mut self, fault: SafetyFault) -> bool {
        let fresh = !self.has_fault(fault);
        if fresh {
            error!("SAFETY FAULT SET: {fault}");
        }
        self.faults |= fault.mask();
        fresh
    }

    /// Clear a fault.  Returns `true` if it was active.
    pub fn clear(&mut self, fault: SafetyFault) -> bool {
        let was = self.has_fault(fault);
        if was {
            info!("SAFETY FAULT CLEARED: {fault}");
        }
        self.faults &= !fault.mask();
        was
    }

    /// Clear every latched fault; returns the ones that were set.
    pub fn clear_latched(&mut self) -> heapless::Vec<SafetyFault, 3> {
        let mut cleared = heapless::Vec::new();
        for fault in SafetyFault::ALL.into_iter().filter(|f| f.is_latched()) {
            if self.clear(fault) {
                let _ = cleared.push(fault);
            }
        }
        cleared
    }

    /// Track the sensor offline condition.  Returns `Some(raised)` when
    /// the fault changed.
    pub fn set_sensor_offline(&mut self, offline: bool) -> Option<bool> {
        let changed = if offline {
            self.raise(SafetyFault::SensorOffline)
        } else {
            self.clear(SafetyFault::SensorOffline)
        };
        changed.then_some(offline)
    }

    /// `true` once a dispense has run longer than the feeding timeout.
    pub fn dispense_overdue(&self, running_for_ms: Option<u32>) -> bool {
        running_for_ms.is_some_and(|t| t > self.feeding_timeout_ms)
    }

    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// A latched fault blocks every dispense.
    pub fn blocks_feeding(&self) -> bool {
        self.faults & LATCHED_MASK != 0
    }

    /// Any fault suspends the auto-feed policy.
    pub fn blocks_auto_feed(&self) -> bool {
        self.has_faults()
    }
}
