//! Alert texts and recipient formatting.

use core::fmt::Write as _;

use super::Priority;
use super::queue::{Recipient, SmsBody};
use crate::config::FeedingMode;
use crate::error::ModemError;

const PREFIX: &str = "Smart Pet Feeder";

/// Snapshot carried by a status report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSummary {
    pub mode: FeedingMode,
    pub auto_feed: bool,
    pub fed_today: u32,
    pub max_daily: u32,
    pub bowl_empty: bool,
    pub hopper_low: bool,
    pub sensor_online: bool,
}

/// Every notification the feeder sends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmsAlert {
    AutoFeed { mode: FeedingMode, grams: u32 },
    ManualFeed { mode: FeedingMode, grams: u32 },
    FeedingError { reason: &'static str },
    DailyReset,
    QuotaExhausted { fed_today: u32, max_daily: u32 },
    HopperLow,
    SystemStatus(StatusSummary),
}

impl SmsAlert {
    pub fn priority(&self) -> Priority {
        match self {
            Self::AutoFeed { .. } | Self::ManualFeed { .. } | Self::FeedingError { .. } => {
                Priority::High
            }
            Self::DailyReset | Self::QuotaExhausted { .. } | Self::HopperLow => Priority::Medium,
            Self::SystemStatus(_) => Priority::Low,
        }
    }

    /// Render the message text.  `now_ms` is stamped as seconds since boot.
    /// Output longer than one SMS is cut at the limit.
    pub fn render(&self, now_ms: u32) -> SmsBody {
        let mut out = Truncating(SmsBody::new());
        let secs = now_ms / 1000;
        let _ = match self {
            Self::AutoFeed { mode, grams } => write!(
                out,
                "{PREFIX}: Auto-fed {} {}g - Bowl was empty. Time: {}s",
                mode.label(),
                grams,
                secs
            ),
            Self::ManualFeed { mode, grams } => write!(
                out,
                "{PREFIX}: Manual feed {} {}g by button press. Time: {}s",
                mode.label(),
                grams,
                secs
            ),
            Self::FeedingError { reason } => {
                write!(out, "{PREFIX} ERROR: {} Time: {}s", reason, secs)
            }
            Self::DailyReset => write!(
                out,
                "{PREFIX}: New day started. Feed counter reset. Auto feeding enabled."
            ),
            Self::QuotaExhausted { fed_today, max_daily } => write!(
                out,
                "{PREFIX}: Bowl empty but daily limit reached ({}/{} feeds).",
                fed_today, max_daily
            ),
            Self::HopperLow => write!(out, "{PREFIX}: Food hopper is running low. Please refill."),
            Self::SystemStatus(s) => write!(
                out,
                "{PREFIX} Status: Mode {}, auto {}, fed {}/{}, bowl {}, hopper {}, sensor {}",
                s.mode.label(),
                if s.auto_feed { "ON" } else { "OFF" },
                s.fed_today,
                s.max_daily,
                if s.bowl_empty { "EMPTY" } else { "OK" },
                if s.hopper_low { "LOW" } else { "OK" },
                if s.sensor_online { "OK" } else { "OFFLINE" },
            ),
        };
        out.0
    }
}

/// `fmt::Write` that keeps what fits and silently drops the rest.
struct Truncating(SmsBody);

impl core::fmt::Write for Truncating {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Normalise a Philippine mobile number to `+63…`.
///
/// `09XXXXXXXXX` and the bare ten-digit `9XXXXXXXXX` gain the country
/// code; anything else passes through unchanged.
pub fn normalize_recipient(number: &str) -> Result<Recipient, ModemError> {
    let number = number.trim();
    let mut out = Recipient::new();
    let local = if let Some(rest) = number.strip_prefix('0').filter(|r| r.starts_with('9')) {
        Some(rest)
    } else if number.starts_with('9') && number.len() == 10 {
        Some(number)
    } else {
        None
    };
    match local {
        Some(rest) => write!(out, "+63{}", rest),
        None => out.push_str(number).map_err(|_| core::fmt::Error),
    }
    .map_err(|_| ModemError::MessageTooLong)?;
    Ok(out)
}
