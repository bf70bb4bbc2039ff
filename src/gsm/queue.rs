//! Bounded SMS queue with priority admission.
//!
//! Insertion order is kept, so items of one priority class leave in FIFO
//! order.  When the queue is full a new item may only displace an
//! occupant of strictly lower priority; the oldest such occupant goes.

use heapless::{String, Vec};
use log::{info, warn};

use super::Priority;
use super::session::SMS_MAX_LEN;
use crate::config::RECIPIENT_CAPACITY;
use crate::error::ModemError;

/// Queue depth.
pub const SMS_QUEUE_CAPACITY: usize = 5;

pub type Recipient = String<RECIPIENT_CAPACITY>;
pub type SmsBody = String<SMS_MAX_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsItem {
    pub recipient: Recipient,
    pub body: SmsBody,
    pub priority: Priority,
    pub enqueued_ms: u32,
}

impl SmsItem {
    pub fn new(
        recipient: &str,
        body: &str,
        priority: Priority,
        enqueued_ms: u32,
    ) -> Result<Self, ModemError> {
        Ok(Self {
            recipient: Recipient::try_from(recipient).map_err(|_| ModemError::MessageTooLong)?,
            body: SmsBody::try_from(body).map_err(|_| ModemError::MessageTooLong)?,
            priority,
            enqueued_ms,
        })
    }
}

/// What happened to an offered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued,
    /// Admitted by evicting an item of the given (lower) priority.
    Evicted(Priority),
    /// Queue full of equal or higher priority items; the offer was dropped.
    Dropped,
}

#[derive(Debug, Default)]
pub struct SmsQueue {
    items: Vec<SmsItem, SMS_QUEUE_CAPACITY>,
}

impl SmsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmsItem> {
        self.items.iter()
    }

    /// Items of class `priority`.
    pub fn count(&self, priority: Priority) -> usize {
        self.items.iter().filter(|i| i.priority == priority).count()
    }

    /// Index of the oldest item of class `priority`.
    pub fn oldest_of(&self, priority: Priority) -> Option<usize> {
        self.items.iter().position(|i| i.priority == priority)
    }

    pub fn enqueue(&mut self, item: SmsItem) -> Admission {
        if !self.items.is_full() {
            info!("SMS queued ({:?}): {}", item.priority, item.body);
            let pushed = self.items.push(item);
            debug_assert!(pushed.is_ok(), "push into a queue with free space");
            return Admission::Queued;
        }

        let Some(lowest) = self.items.iter().map(|i| i.priority).max() else {
            return Admission::Dropped;
        };
        if !item.priority.outranks(lowest) {
            warn!("SMS queue full, dropped ({:?}): {}", item.priority, item.body);
            return Admission::Dropped;
        }

        if let Some(victim) = self.oldest_of(lowest) {
            let evicted = self.items.remove(victim);
            warn!(
                "SMS queue full, evicted ({:?}) {} for ({:?})",
                evicted.priority, evicted.body, item.priority
            );
        }
        let pushed = self.items.push(item);
        debug_assert!(pushed.is_ok(), "push after eviction");
        Admission::Evicted(lowest)
    }

    /// Remove the item at `index`, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<SmsItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }
}
