//! SMS queue drain with per-priority rate limiting.
//!
//! Each priority class has its own minimum spacing, measured from that
//! class's last send.  A drain sends the most urgent queued item whose
//! class gate is open, so a rate-limited High never holds back a Low
//! that is free to go.

use log::{debug, info};

use super::queue::{Admission, SmsItem, SmsQueue};
use super::{ModemStatus, Priority};
use crate::app::ports::SmsLink;
use crate::config::SystemConfig;
use crate::error::ModemError;
use crate::time::has_elapsed_since;

/// Result of one [`SmsDispatcher::drain`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue empty.
    Empty,
    /// Items waiting but the modem is not `SmsReady`.
    NotReady,
    /// Items waiting but every class with items is rate-limited.
    Deferred,
    Sent(Priority),
    /// The send failed; the item was discarded.
    Failed(Priority, ModemError),
}

pub struct SmsDispatcher {
    queue: SmsQueue,
    intervals_ms: [u32; 3],
    last_sent_ms: [Option<u32>; 3],
    sent: u32,
    failed: u32,
}

impl SmsDispatcher {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            queue: SmsQueue::new(),
            intervals_ms: [
                config.sms_high_interval_ms,
                config.sms_medium_interval_ms,
                config.sms_low_interval_ms,
            ],
            last_sent_ms: [None; 3],
            sent: 0,
            failed: 0,
        }
    }

    pub fn enqueue(&mut self, item: SmsItem) -> Admission {
        self.queue.enqueue(item)
    }

    pub fn queue(&self) -> &SmsQueue {
        &self.queue
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// (sent, failed) since boot.
    pub fn counters(&self) -> (u32, u32) {
        (self.sent, self.failed)
    }

    pub fn gate_open(&self, priority: Priority, now_ms: u32) -> bool {
        let i = priority.index();
        has_elapsed_since(now_ms, self.last_sent_ms[i], self.intervals_ms[i])
    }

    /// Send at most one queued message.
    pub fn drain(&mut self, now_ms: u32, link: &mut impl SmsLink) -> DrainOutcome {
        if self.queue.is_empty() {
            return DrainOutcome::Empty;
        }
        if link.status() != ModemStatus::SmsReady {
            return DrainOutcome::NotReady;
        }

        let Some((priority, index)) = Priority::ALL
            .iter()
            .filter(|&&p| self.gate_open(p, now_ms))
            .find_map(|&p| self.queue.oldest_of(p).map(|i| (p, i)))
        else {
            debug!("SMS drain deferred: {} queued, all classes rate-limited", self.queue.len());
            return DrainOutcome::Deferred;
        };

        let Some(item) = self.queue.remove(index) else {
            return DrainOutcome::Empty;
        };
        self.last_sent_ms[priority.index()] = Some(now_ms);

        match link.send_sms(&item.recipient, &item.body) {
            Ok(()) => {
                self.sent += 1;
                info!("SMS sent ({:?}), {} left in queue", priority, self.queue.len());
                DrainOutcome::Sent(priority)
            }
            Err(e) => {
                self.failed += 1;
                DrainOutcome::Failed(priority, e)
            }
        }
    }
}
