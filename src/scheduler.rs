//! Cooperative task table.
//!
//! The control loop runs every tick; slower work runs on its own fixed
//! interval.  [`Scheduler::due`] reports which periodic tasks are due, in
//! table order, and stamps them as run.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  tick ─▶ buttons ─▶ e-stop ─▶ [SensorRead] ─▶ [AutoFeedCheck]│
//! │       ─▶ motor slice ─▶ [ModemPoll] ─▶ SMS drain ─▶ [Status] │
//! └─────────────────────────────────────────────────────────────┘
//!          [bracketed] = gated by this scheduler
//! ```
//!
//! A task that is late (for example behind a blocking SMS send) runs
//! once and restarts its interval from that moment; missed periods are
//! not replayed.

use heapless::Vec;
use log::debug;

use crate::config::SystemConfig;
use crate::time::has_elapsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    SensorRead,
    AutoFeedCheck,
    ModemPoll,
    StatusReport,
}

impl TaskId {
    pub const COUNT: usize = 4;

    pub fn label(self) -> &'static str {
        match self {
            Self::SensorRead => "sensor-read",
            Self::AutoFeedCheck => "auto-feed-check",
            Self::ModemPoll => "modem-poll",
            Self::StatusReport => "status-report",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TaskEntry {
    id: TaskId,
    interval_ms: u32,
    last_run_ms: u32,
    /// Run on the next check regardless of the interval.
    forced: bool,
}

pub type DueTasks = Vec<TaskId, { TaskId::COUNT }>;

pub struct Scheduler {
    tasks: [TaskEntry; TaskId::COUNT],
}

impl Scheduler {
    /// All intervals start counting at `now_ms`.
    pub fn new(config: &SystemConfig, now_ms: u32) -> Self {
        let entry = |id, interval_ms| TaskEntry {
            id,
            interval_ms,
            last_run_ms: now_ms,
            forced: false,
        };
        Self {
            tasks: [
                entry(TaskId::SensorRead, config.sensor_read_interval_ms),
                entry(TaskId::AutoFeedCheck, config.auto_feed_check_interval_ms),
                entry(TaskId::ModemPoll, config.modem_poll_interval_ms),
                entry(TaskId::StatusReport, config.status_report_interval_ms),
            ],
        }
    }

    /// Tasks due at `now_ms`, in fixed order.  Each returned task is
    /// marked as run.
    pub fn due(&mut self, now_ms: u32) -> DueTasks {
        let mut due = DueTasks::new();
        for task in self.tasks.iter_mut() {
            if task.forced || has_elapsed(now_ms, task.last_run_ms, task.interval_ms) {
                task.last_run_ms = now_ms;
                task.forced = false;
                // cannot overflow: one slot per task
                let _ = due.push(task.id);
            }
        }
        due
    }

    /// Make `id` due on the next check.
    pub fn run_soon(&mut self, id: TaskId) {
        let task = &mut self.tasks[id as usize];
        if !task.forced {
            debug!("Scheduler: '{}' deferred to next check", id.label());
        }
        task.forced = true;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
