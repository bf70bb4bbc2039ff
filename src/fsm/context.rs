//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard the auto-feed states read from and
//! write to: the latest inputs, the policy memory that survives across
//! states, and the outputs the caller drains after each poll.

use heapless::Vec;

use crate::config::{FeedingMode, SystemConfig};
use crate::control::profile::MotionRequest;
use crate::gsm::message::SmsAlert;

/// Alerts one poll can raise (feed, daily reset, quota notice).
pub const ALERT_CAPACITY: usize = 4;

// ---------------------------------------------------------------------------
// Inputs (written by the caller before each tick)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInputs {
    /// Classified bowl state from the sensor hub.
    pub bowl_empty: bool,
    /// Motor idle, no latched fault, sensor online.
    pub feeder_ready: bool,
    /// Auto-feed switched on.
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Policy memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoFeedState {
    /// When the current empty streak began.
    pub bowl_empty_since: Option<u32>,
    /// The current empty streak has been confirmed (and cued).
    pub confirmed: bool,
    pub last_feed_at: Option<u32>,
    /// Automatic feeds in the current daily window.
    pub daily_count: u32,
    /// Start of the current daily window.
    pub daily_reset_at: u32,
    pub last_quota_alert_at: Option<u32>,
}

// ---------------------------------------------------------------------------
// Outputs (consumed by the caller after each poll)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PolicyOutputs {
    /// Dispense to start.
    pub feed: Option<MotionRequest>,
    /// Play the "empty confirmed" cue.
    pub confirm_cue: bool,
    pub alerts: Vec<SmsAlert, ALERT_CAPACITY>,
}

impl PolicyOutputs {
    pub fn clear(&mut self) {
        self.feed = None;
        self.confirm_cue = false;
        self.alerts.clear();
    }

    /// Queue an alert for the caller.  Overflow is logged and dropped.
    pub fn alert(&mut self, alert: SmsAlert) {
        if self.alerts.push(alert).is_err() {
            log::warn!("Policy alert buffer full, dropped {:?}", alert);
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    /// Clock for this tick.
    pub now_ms: u32,

    pub inputs: PolicyInputs,
    pub mode: FeedingMode,
    pub feed: AutoFeedState,
    pub outputs: PolicyOutputs,

    pub config: SystemConfig,
}

impl FsmContext {
    /// New context; the daily window starts at `now_ms`.
    pub fn new(config: SystemConfig, now_ms: u32) -> Self {
        Self {
            now_ms,
            inputs: PolicyInputs {
                bowl_empty: false,
                feeder_ready: false,
                enabled: config.auto_feed_enabled,
            },
            mode: config.initial_mode,
            feed: AutoFeedState {
                daily_reset_at: now_ms,
                ..AutoFeedState::default()
            },
            outputs: PolicyOutputs::default(),
            config,
        }
    }

    pub fn quota_exhausted(&self) -> bool {
        self.feed.daily_count >= self.config.max_daily_auto_feeds
    }

    /// Forget the current empty streak.
    pub fn clear_confirmation(&mut self) {
        self.feed.bowl_empty_since = None;
        self.feed.confirmed = false;
    }
}
