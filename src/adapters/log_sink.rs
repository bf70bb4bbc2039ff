//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) => {
                let distance = s.distance_cm.unwrap_or(f32::NAN);
                info!(
                    "STATUS | state={} | mode={} auto={} | fed={}/{} | d={:.1}cm \
                     bowl={} hopper={} sensor={} | modem={} sms={} | faults=0b{:03b}",
                    s.state.label(),
                    s.mode.label(),
                    if s.auto_feed { "on" } else { "off" },
                    s.fed_today,
                    s.max_daily,
                    distance,
                    if s.bowl_empty { "EMPTY" } else { "OK" },
                    if s.hopper_low { "LOW" } else { "OK" },
                    if s.sensor_online { "online" } else { "OFFLINE" },
                    s.modem.label(),
                    s.sms_pending,
                    s.fault_flags,
                );
            }
            AppEvent::Started {
                mode,
                sensor_online,
            } => {
                info!("START | mode={} sensor_online={}", mode.label(), sensor_online);
            }
            AppEvent::SystemStateChanged { from, to } => {
                info!("STATE | {} -> {}", from.label(), to.label());
            }
            AppEvent::ModeChanged(mode) => info!("MODE | {}", mode.label()),
            AppEvent::AutoFeedToggled(on) => info!("AUTO | enabled={}", on),
            AppEvent::BowlEmpty { distance_cm } => info!("BOWL | empty at {:.1}cm", distance_cm),
            AppEvent::BowlFilled { distance_cm } => info!("BOWL | filled at {:.1}cm", distance_cm),
            AppEvent::HopperLow { distance_cm } => warn!("HOPPER | low at {:.1}cm", distance_cm),
            AppEvent::HopperRefilled { distance_cm } => {
                info!("HOPPER | refilled at {:.1}cm", distance_cm)
            }
            AppEvent::EmptyConfirmed => info!("BOWL | empty confirmed"),
            AppEvent::SensorFailed(e) => warn!("SENSOR | {}", e),
            AppEvent::FeedStarted { kind, steps, grams } => {
                info!("FEED | {:?} start {} steps ({:.0}g)", kind, steps, grams)
            }
            AppEvent::FeedCompleted { kind, steps } => {
                info!("FEED | {:?} done {} steps", kind, steps)
            }
            AppEvent::FeedAborted { kind, done, total } => {
                warn!("FEED | {:?} aborted at {}/{}", kind, done, total)
            }
            AppEvent::FeedRejected { kind, reason } => {
                warn!("FEED | {:?} rejected: {}", kind, reason)
            }
            AppEvent::DailyReset => info!("AUTO | daily counter reset"),
            AppEvent::QuotaExhausted {
                fed_today,
                max_daily,
            } => warn!("AUTO | quota exhausted {}/{}", fed_today, max_daily),
            AppEvent::SmsQueued {
                priority,
                admission,
            } => info!("SMS | queued {:?}: {:?}", priority, admission),
            AppEvent::SmsSent(priority) => info!("SMS | sent {:?}", priority),
            AppEvent::SmsFailed { priority, error } => {
                warn!("SMS | {:?} failed: {}", priority, error)
            }
            AppEvent::ModemStatusChanged { from, to } => {
                info!("MODEM | {} -> {}", from.label(), to.label())
            }
            AppEvent::FaultRaised(f) => warn!("FAULT | raised: {}", f),
            AppEvent::FaultCleared(f) => info!("FAULT | cleared: {}", f),
            AppEvent::EmergencyStop => warn!("FAULT | emergency stop"),
        }
    }
}
