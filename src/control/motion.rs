//! Resumable dispense execution.
//!
//! [`MotionController`] owns at most one active move.  The scheduler
//! calls [`MotionController::service`] every tick; each call emits at
//! most `steps_per_slice` pulses and returns, so a multi-second dispense
//! never starves the sensor, button or modem work.  Between slices the
//! move is just an iterator position.
//!
//! An emergency stop can be requested from interrupt context through
//! [`request_emergency_stop`]; the flag is checked before every pulse.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use super::profile::{MotionProfile, MotionRequest, Pulses};
use crate::app::ports::MotorPort;
use crate::error::MotorError;
use crate::time::elapsed_ms;

/// Set from an ISR (or any context) to abort the running move.
static EMERGENCY_STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Request an emergency stop.  Lock-free, safe from interrupt context.
pub fn request_emergency_stop() {
    EMERGENCY_STOP_REQUESTED.store(true, Ordering::Release);
}

/// Consume a pending emergency-stop request.
pub fn take_emergency_stop_request() -> bool {
    EMERGENCY_STOP_REQUESTED.swap(false, Ordering::AcqRel)
}

fn emergency_stop_pending() -> bool {
    EMERGENCY_STOP_REQUESTED.load(Ordering::Acquire)
}

/// Who asked for the dispense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Manual,
    Auto,
}

/// Result of one [`MotionController::service`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    /// No move active.
    Idle,
    /// Slice done, move continues next tick.
    Running { done: u32, total: u32 },
    /// Final pulse emitted; driver disabled.
    Completed { kind: FeedKind, steps: u32 },
    /// Stopped early; driver disabled.
    Aborted { kind: FeedKind, done: u32, total: u32 },
}

struct ActiveMove {
    kind: FeedKind,
    started_ms: u32,
    pulses: Pulses,
}

/// Owns the running dispense, if any.
pub struct MotionController {
    active: Option<ActiveMove>,
    steps_per_slice: u32,
    last_completed_ms: Option<u32>,
}

impl MotionController {
    pub fn new(steps_per_slice: u32) -> Self {
        Self {
            active: None,
            steps_per_slice: steps_per_slice.max(1),
            last_completed_ms: None,
        }
    }

    /// Plan and begin a move.  Energises the driver and sets the
    /// direction; no pulse is emitted until the next [`service`](Self::service).
    pub fn start(
        &mut self,
        request: &MotionRequest,
        kind: FeedKind,
        now_ms: u32,
        motor: &mut impl MotorPort,
    ) -> Result<MotionProfile, MotorError> {
        if self.active.is_some() {
            return Err(MotorError::Busy);
        }
        let profile = MotionProfile::plan(request)?;

        info!(
            "Dispense start ({:?}): {} steps = {} accel + {} cruise + {} decel @ {} Hz",
            kind,
            profile.total_steps,
            profile.accel_steps,
            profile.cruise_steps,
            profile.decel_steps,
            request.max_speed_hz
        );

        motor.enable();
        motor.set_direction(true);
        self.active = Some(ActiveMove {
            kind,
            started_ms: now_ms,
            pulses: profile.pulses(),
        });
        Ok(profile)
    }

    /// Emit the next slice of pulses.
    pub fn service(&mut self, now_ms: u32, motor: &mut impl MotorPort) -> MotionStatus {
        let Some(active) = self.active.as_mut() else {
            return MotionStatus::Idle;
        };

        let mut stop_requested = false;
        for _ in 0..self.steps_per_slice {
            if emergency_stop_pending() {
                stop_requested = true;
                break;
            }
            match active.pulses.next() {
                Some(step) => motor.pulse(step.period_us),
                None => break,
            }
        }
        if stop_requested {
            return self.abort(motor).unwrap_or(MotionStatus::Idle);
        }

        let done = active.pulses.emitted();
        let total = active.pulses.profile().total_steps;
        if done < total {
            return MotionStatus::Running { done, total };
        }

        let kind = active.kind;
        motor.disable();
        self.active = None;
        self.last_completed_ms = Some(now_ms);
        info!("Dispense complete ({:?}): {} steps", kind, total);
        MotionStatus::Completed { kind, steps: total }
    }

    /// Stop immediately: driver off, remaining pulses discarded.
    /// Returns the aborted move, if one was running.
    pub fn abort(&mut self, motor: &mut impl MotorPort) -> Option<MotionStatus> {
        motor.disable();
        let active = self.active.take()?;
        let done = active.pulses.emitted();
        let total = active.pulses.profile().total_steps;
        warn!("Dispense aborted ({:?}) after {}/{} steps", active.kind, done, total);
        Some(MotionStatus::Aborted {
            kind: active.kind,
            done,
            total,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<FeedKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    /// How long the current move has been running.
    pub fn running_for_ms(&self, now_ms: u32) -> Option<u32> {
        self.active.as_ref().map(|a| elapsed_ms(now_ms, a.started_ms))
    }

    pub fn last_completed_ms(&self) -> Option<u32> {
        self.last_completed_ms
    }
}
