//! Trapezoidal stepper motion profile.
//!
//! ```text
//!  period
//!   10 ms ┤▇
//!         │ ▇▇                               ▇▇
//!         │   ▇▇                           ▇▇
//!         │     ▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇
//!   5 ms  ┤  accel        cruise          decel
//!         └──────────────────────────────────────▶ step
//! ```
//!
//! The ramp length is `min(steps / 4, acceleration)`, so a short move
//! never spends more than half its steps ramping.  The per-step period
//! falls linearly from [`START_PERIOD_US`] to the cruise period
//! `1 s / max_speed_hz` and the deceleration ramp mirrors it exactly.
//!
//! The profile is pure arithmetic; [`Pulses`] yields it lazily one step
//! at a time so the controller can stop anywhere.

use crate::error::MotorError;

/// Period of the first (slowest) step.
pub const START_PERIOD_US: u32 = 10_000;
/// Shortest period the mechanics are rated for.
pub const MIN_PERIOD_US: u32 = 1_000;

/// A dispense move.  Immutable once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRequest {
    pub total_steps: u32,
    /// Cruise step rate in steps per second.
    pub max_speed_hz: u32,
    /// Upper bound on the ramp length in steps.
    pub acceleration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Accelerating,
    Cruising,
    Decelerating,
}

/// Planned accel / cruise / decel split and step timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionProfile {
    pub total_steps: u32,
    pub accel_steps: u32,
    pub cruise_steps: u32,
    pub decel_steps: u32,
    pub start_period_us: u32,
    pub cruise_period_us: u32,
    /// Period decrement per accel step.
    pub ramp_step_us: u32,
}

impl MotionProfile {
    /// Plan a move.  Zero steps or zero speed is rejected.
    pub fn plan(request: &MotionRequest) -> Result<Self, MotorError> {
        if request.total_steps == 0 {
            return Err(MotorError::InvalidPortion);
        }
        if request.max_speed_hz == 0 {
            return Err(MotorError::InvalidSpeed);
        }

        let accel_steps = (request.total_steps / 4).min(request.acceleration);
        let cruise_steps = request.total_steps - 2 * accel_steps;
        let cruise_period_us =
            (1_000_000 / request.max_speed_hz).clamp(MIN_PERIOD_US, START_PERIOD_US);
        let ramp_step_us = if accel_steps == 0 {
            0
        } else {
            (START_PERIOD_US - cruise_period_us) / accel_steps
        };

        Ok(Self {
            total_steps: request.total_steps,
            accel_steps,
            cruise_steps,
            decel_steps: accel_steps,
            start_period_us: START_PERIOD_US,
            cruise_period_us,
            ramp_step_us,
        })
    }

    /// Which phase step `index` (0-based) belongs to.
    pub fn phase_at(&self, index: u32) -> MotionPhase {
        if index < self.accel_steps {
            MotionPhase::Accelerating
        } else if index < self.accel_steps + self.cruise_steps {
            MotionPhase::Cruising
        } else {
            MotionPhase::Decelerating
        }
    }

    /// Step period for step `index` (0-based).
    pub fn period_at(&self, index: u32) -> u32 {
        match self.phase_at(index) {
            MotionPhase::Accelerating => self.ramp_period(index),
            MotionPhase::Cruising => self.cruise_period_us,
            MotionPhase::Decelerating => {
                let from_end = self.total_steps - 1 - index;
                self.ramp_period(from_end)
            }
        }
    }

    /// Lazy pulse sequence over the whole move.
    pub fn pulses(&self) -> Pulses {
        Pulses {
            profile: *self,
            next: 0,
        }
    }

    /// Sum of all step periods, i.e. the nominal move duration.
    pub fn duration_us(&self) -> u64 {
        self.pulses().map(|p| u64::from(p.period_us)).sum()
    }

    fn ramp_period(&self, ramp_index: u32) -> u32 {
        self.start_period_us - ramp_index * self.ramp_step_us
    }
}

/// One step of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPulse {
    pub index: u32,
    pub phase: MotionPhase,
    pub period_us: u32,
}

/// Iterator over the steps of a [`MotionProfile`].
#[derive(Debug, Clone)]
pub struct Pulses {
    profile: MotionProfile,
    next: u32,
}

impl Pulses {
    /// Steps already yielded.
    pub fn emitted(&self) -> u32 {
        self.next
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }
}

impl Iterator for Pulses {
    type Item = StepPulse;

    fn next(&mut self) -> Option<StepPulse> {
        if self.next >= self.profile.total_steps {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(StepPulse {
            index,
            phase: self.profile.phase_at(index),
            period_us: self.profile.period_at(index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.profile.total_steps - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Pulses {}
