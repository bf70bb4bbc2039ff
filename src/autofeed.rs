//! Auto-feed policy: daily quota window plus the confirmation FSM.
//!
//! Polled on the auto-feed check interval, not every tick.  A poll may
//! run several FSM transitions back to back (for example Idle straight
//! through to Dispensing when the bowl has been empty long enough), but
//! stops as soon as a dispense has been requested.

use log::info;

use crate::config::{FeedingMode, SystemConfig};
use crate::fsm::context::{AutoFeedState, FsmContext, PolicyInputs, PolicyOutputs};
use crate::fsm::{Fsm, StateId, states};
use crate::gsm::message::SmsAlert;
use crate::time::has_elapsed;

pub struct AutoFeedPolicy {
    fsm: Fsm,
    ctx: FsmContext,
}

impl AutoFeedPolicy {
    pub fn new(config: &SystemConfig, now_ms: u32) -> Self {
        let mut ctx = FsmContext::new(config.clone(), now_ms);
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    /// Evaluate the policy.  The returned outputs belong to this poll only.
    pub fn poll(&mut self, now_ms: u32, bowl_empty: bool, feeder_ready: bool) -> PolicyOutputs {
        self.ctx.outputs.clear();
        self.ctx.now_ms = now_ms;
        self.ctx.inputs = PolicyInputs {
            bowl_empty,
            feeder_ready,
            enabled: self.ctx.inputs.enabled,
        };

        self.roll_daily_window(now_ms);

        for _ in 0..StateId::COUNT {
            match self.fsm.tick(&mut self.ctx) {
                Some(StateId::Dispensing) | None => break,
                Some(_) => {}
            }
        }
        core::mem::take(&mut self.ctx.outputs)
    }

    fn roll_daily_window(&mut self, now_ms: u32) {
        let feed = &mut self.ctx.feed;
        if has_elapsed(now_ms, feed.daily_reset_at, self.ctx.config.daily_window_ms) {
            info!("Daily window rolled over ({} auto-feeds yesterday)", feed.daily_count);
            feed.daily_count = 0;
            feed.daily_reset_at = now_ms;
            feed.last_quota_alert_at = None;
            self.ctx.outputs.alert(SmsAlert::DailyReset);
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn state_name(&self) -> &'static str {
        self.fsm.current_name()
    }

    pub fn mode(&self) -> FeedingMode {
        self.ctx.mode
    }

    pub fn set_mode(&mut self, mode: FeedingMode) {
        self.ctx.mode = mode;
    }

    pub fn is_enabled(&self) -> bool {
        self.ctx.inputs.enabled
    }

    /// Switching off while a confirmed bowl waits for its feed parks the
    /// policy in Suppressed at once instead of on the next check.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.ctx.inputs.enabled {
            info!("Auto-feed {}", if enabled { "enabled" } else { "disabled" });
        }
        self.ctx.inputs.enabled = enabled;
        if !enabled && self.fsm.current_state() == StateId::ReadyToFeed {
            self.fsm.force_transition(StateId::Suppressed, &mut self.ctx);
        }
    }

    pub fn memory(&self) -> &AutoFeedState {
        &self.ctx.feed
    }

    pub fn daily_count(&self) -> u32 {
        self.ctx.feed.daily_count
    }

    pub fn max_daily(&self) -> u32 {
        self.ctx.config.max_daily_auto_feeds
    }
}
