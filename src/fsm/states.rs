//! Auto-feed state handlers and table builder.
//!
//! Each state is three plain `fn` pointers; no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[bowl empty]──▶ CONFIRMING_EMPTY ──[empty for window]──▶ READY_TO_FEED
//!   ▲                                                               │      ▲  │
//!   │                                         [quota used / disabled] │      │  │ [interval ok,
//!   │                                                               ▼      │  │  feeder ready]
//!   │                                                        SUPPRESSED ───┘  ▼
//!   └─────────────────────[next poll]───────────────────────────────── DISPENSING
//!
//!  Any state ──[bowl not empty]──▶ IDLE   (confirmation cleared)
//! ```

use log::{info, warn};

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::gsm::message::SmsAlert;
use crate::time::{elapsed_ms, has_elapsed, has_elapsed_since};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: ConfirmingEmpty
        StateDescriptor {
            id: StateId::ConfirmingEmpty,
            name: "ConfirmingEmpty",
            on_enter: Some(confirming_enter),
            on_exit: None,
            on_update: confirming_update,
        },
        // Index 2: ReadyToFeed
        StateDescriptor {
            id: StateId::ReadyToFeed,
            name: "ReadyToFeed",
            on_enter: Some(ready_enter),
            on_exit: None,
            on_update: ready_update,
        },
        // Index 3: Dispensing
        StateDescriptor {
            id: StateId::Dispensing,
            name: "Dispensing",
            on_enter: Some(dispensing_enter),
            on_exit: None,
            on_update: dispensing_update,
        },
        // Index 4: Suppressed
        StateDescriptor {
            id: StateId::Suppressed,
            name: "Suppressed",
            on_enter: Some(suppressed_enter),
            on_exit: Some(suppressed_exit),
            on_update: suppressed_update,
        },
    ]
}

fn may_feed(ctx: &FsmContext) -> bool {
    ctx.inputs.enabled && !ctx.quota_exhausted()
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.clear_confirmation();
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.inputs.bowl_empty {
        return Some(StateId::ConfirmingEmpty);
    }
    ctx.clear_confirmation();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIRMING_EMPTY
// ═══════════════════════════════════════════════════════════════════════════

fn confirming_enter(ctx: &mut FsmContext) {
    if ctx.feed.bowl_empty_since.is_none() {
        ctx.feed.bowl_empty_since = Some(ctx.now_ms);
        info!(
            "Bowl empty, confirming for {} s",
            ctx.config.bowl_empty_confirmation_ms / 1000
        );
    }
}

fn confirming_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.inputs.bowl_empty {
        info!("Bowl refilled before confirmation");
        return Some(StateId::Idle);
    }
    let since = *ctx.feed.bowl_empty_since.get_or_insert(ctx.now_ms);
    has_elapsed(ctx.now_ms, since, ctx.config.bowl_empty_confirmation_ms)
        .then_some(StateId::ReadyToFeed)
}

// ═══════════════════════════════════════════════════════════════════════════
//  READY_TO_FEED
// ═══════════════════════════════════════════════════════════════════════════

fn ready_enter(ctx: &mut FsmContext) {
    if !ctx.feed.confirmed {
        ctx.feed.confirmed = true;
        ctx.outputs.confirm_cue = true;
        let since = ctx.feed.bowl_empty_since.unwrap_or(ctx.now_ms);
        info!("Bowl empty confirmed after {} s", elapsed_ms(ctx.now_ms, since) / 1000);
    }
}

fn ready_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.inputs.bowl_empty {
        return Some(StateId::Idle);
    }
    if !may_feed(ctx) {
        return Some(StateId::Suppressed);
    }
    let spaced = has_elapsed_since(
        ctx.now_ms,
        ctx.feed.last_feed_at,
        ctx.config.auto_feed_min_interval_ms,
    );
    (spaced && ctx.inputs.feeder_ready).then_some(StateId::Dispensing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISPENSING
// ═══════════════════════════════════════════════════════════════════════════

fn dispensing_enter(ctx: &mut FsmContext) {
    let steps = ctx.config.portion(ctx.mode).auto();
    ctx.outputs.feed = Some(ctx.config.motion_request(steps));
    ctx.feed.daily_count += 1;
    ctx.feed.last_feed_at = Some(ctx.now_ms);
    ctx.clear_confirmation();

    let grams = ctx.config.steps_to_grams(steps) as u32;
    info!(
        "Auto-feed {} ({} steps, ~{} g), {}/{} today",
        ctx.mode.label(),
        steps,
        grams,
        ctx.feed.daily_count,
        ctx.config.max_daily_auto_feeds
    );
    ctx.outputs.alert(SmsAlert::AutoFeed {
        mode: ctx.mode,
        grams,
    });
}

fn dispensing_update(_ctx: &mut FsmContext) -> Option<StateId> {
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUPPRESSED
// ═══════════════════════════════════════════════════════════════════════════

fn suppressed_enter(ctx: &mut FsmContext) {
    if ctx.quota_exhausted() {
        warn!(
            "Auto-feed suppressed: daily limit {} reached",
            ctx.config.max_daily_auto_feeds
        );
    } else {
        info!("Auto-feed suppressed: disabled");
    }
}

fn suppressed_exit(_ctx: &mut FsmContext) {
    info!("Auto-feed suppression lifted");
}

fn suppressed_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.inputs.bowl_empty {
        return Some(StateId::Idle);
    }
    if may_feed(ctx) {
        return Some(StateId::ReadyToFeed);
    }
    if ctx.quota_exhausted()
        && has_elapsed_since(
            ctx.now_ms,
            ctx.feed.last_quota_alert_at,
            ctx.config.quota_alert_interval_ms,
        )
    {
        ctx.feed.last_quota_alert_at = Some(ctx.now_ms);
        ctx.outputs.alert(SmsAlert::QuotaExhausted {
            fed_today: ctx.feed.daily_count,
            max_daily: ctx.config.max_daily_auto_feeds,
        });
    }
    None
}
