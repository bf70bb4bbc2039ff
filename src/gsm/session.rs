//! Modem session state machine.
//!
//! ```text
//!  Offline ──begin──▶ Initializing ──AT ok──▶ NetworkSearching ──CREG 0,1|0,5──▶
//!      NetworkConnected ──CMGF ok──▶ SmsReady
//!
//!  Initializing   past init deadline        ──▶ Error
//!  Searching /    past 2 × init deadline    ──▶ Error
//!  Connected
//!  SmsReady       liveness probe fails      ──▶ Initializing
//!  Error          recovery interval elapsed ──▶ reset + Initializing
//! ```
//!
//! Each [`poll`](ModemSession::poll) performs at most one bounded AT
//! exchange.  The caller decides how often to poll.

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};

use super::ModemStatus;
use super::at::{self, CTRL_Z, ESC};
use crate::app::ports::{ModemTransport, SmsLink, TimePort};
use crate::config::SystemConfig;
use crate::error::ModemError;
use crate::time::{elapsed_ms, has_elapsed_since};

/// Longest SMS body accepted in text mode.
pub const SMS_MAX_LEN: usize = 160;

const REGISTERED: [&str; 2] = ["+CREG: 0,1", "+CREG: 0,5"];

/// Session timing, copied out of [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub init_timeout_ms: u32,
    pub at_timeout_ms: u32,
    pub network_timeout_ms: u32,
    pub liveness_interval_ms: u32,
    pub recovery_interval_ms: u32,
    pub send_timeout_ms: u32,
}

impl From<&SystemConfig> for SessionTimings {
    fn from(c: &SystemConfig) -> Self {
        Self {
            init_timeout_ms: c.modem_init_timeout_ms,
            at_timeout_ms: c.modem_at_timeout_ms,
            network_timeout_ms: c.modem_network_timeout_ms,
            liveness_interval_ms: c.modem_liveness_interval_ms,
            recovery_interval_ms: c.modem_recovery_interval_ms,
            send_timeout_ms: c.sms_send_timeout_ms,
        }
    }
}

/// Owns the modem transport and walks it to `SmsReady`.
pub struct ModemSession<T, C> {
    transport: T,
    clock: C,
    timings: SessionTimings,
    status: ModemStatus,
    init_started_ms: u32,
    last_liveness_ms: Option<u32>,
    error_since_ms: Option<u32>,
    sent: u32,
}

impl<T: ModemTransport, C: TimePort> ModemSession<T, C> {
    pub fn new(transport: T, clock: C, timings: SessionTimings) -> Self {
        Self {
            transport,
            clock,
            timings,
            status: ModemStatus::Offline,
            init_started_ms: 0,
            last_liveness_ms: None,
            error_since_ms: None,
            sent: 0,
        }
    }

    /// Hardware reset, then start initialisation.
    pub fn begin(&mut self, now_ms: u32) {
        info!("Modem: hardware reset, initialising");
        self.transport.reset();
        self.transport.clear_input();
        self.init_started_ms = now_ms;
        self.last_liveness_ms = None;
        self.error_since_ms = None;
        self.set_status(ModemStatus::Initializing);
    }

    /// Messages sent since boot.
    pub fn sent_count(&self) -> u32 {
        self.sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn set_status(&mut self, next: ModemStatus) {
        if next != self.status {
            info!("Modem: {} -> {}", self.status.label(), next.label());
            self.status = next;
        }
    }

    fn fail(&mut self, now_ms: u32, why: &str) {
        warn!("Modem: {}", why);
        self.error_since_ms = Some(now_ms);
        self.set_status(ModemStatus::Error);
    }

    fn command(&mut self, cmd: &str, expected: &[&str], timeout_ms: u32) -> Result<usize, ModemError> {
        at::send_command(&mut self.transport, &self.clock, cmd, expected, timeout_ms)
    }

    fn init_elapsed(&self, now_ms: u32) -> u32 {
        elapsed_ms(now_ms, self.init_started_ms)
    }

    fn step(&mut self, now_ms: u32) {
        let t = self.timings;
        match self.status {
            ModemStatus::Offline => {}

            ModemStatus::Initializing => {
                if self.init_elapsed(now_ms) > t.init_timeout_ms {
                    self.fail(now_ms, "initialisation timeout");
                    return;
                }
                if self.command("AT", &["OK"], t.at_timeout_ms).is_ok() {
                    if let Err(e) = self.command("AT+CMGF=1", &["OK"], t.at_timeout_ms) {
                        warn!("Modem: text mode not accepted yet ({})", e);
                    }
                    self.set_status(ModemStatus::NetworkSearching);
                }
            }

            ModemStatus::NetworkSearching => {
                if self.command("AT+CREG?", &REGISTERED, t.network_timeout_ms).is_ok() {
                    self.set_status(ModemStatus::NetworkConnected);
                } else if self.init_elapsed(now_ms) > t.init_timeout_ms.saturating_mul(2) {
                    self.fail(now_ms, "network registration timeout");
                }
            }

            ModemStatus::NetworkConnected => {
                if self.command("AT+CMGF=1", &["OK"], t.at_timeout_ms).is_ok() {
                    self.last_liveness_ms = Some(now_ms);
                    self.set_status(ModemStatus::SmsReady);
                } else if self.init_elapsed(now_ms) > t.init_timeout_ms.saturating_mul(2) {
                    self.fail(now_ms, "SMS mode timeout");
                }
            }

            ModemStatus::SmsReady => {
                if has_elapsed_since(now_ms, self.last_liveness_ms, t.liveness_interval_ms) {
                    self.last_liveness_ms = Some(now_ms);
                    if self.command("AT", &["OK"], t.at_timeout_ms).is_err() {
                        warn!("Modem: liveness probe failed, reinitialising");
                        self.init_started_ms = now_ms;
                        self.set_status(ModemStatus::Initializing);
                    }
                }
            }

            ModemStatus::Error => {
                if has_elapsed_since(now_ms, self.error_since_ms, t.recovery_interval_ms) {
                    info!("Modem: attempting recovery");
                    self.begin(now_ms);
                }
            }
        }
    }

    fn send_sequence(&mut self, recipient: &str, body: &str) -> Result<(), ModemError> {
        let t = self.timings;
        self.command("AT+CMGF=1", &["OK"], t.at_timeout_ms)?;

        let mut cmgs: String<40> = String::new();
        write!(cmgs, "AT+CMGS=\"{}\"", recipient).map_err(|_| ModemError::MessageTooLong)?;
        if let Err(e) = self.command(&cmgs, &[">"], t.at_timeout_ms) {
            let _ = self.transport.write(&[ESC]);
            return Err(e);
        }

        self.transport.write(body.as_bytes())?;
        self.transport.write(&[CTRL_Z])?;
        at::await_response(&mut self.transport, &self.clock, &["+CMGS"], t.send_timeout_ms)?;
        Ok(())
    }
}

impl<T: ModemTransport, C: TimePort> SmsLink for ModemSession<T, C> {
    fn status(&self) -> ModemStatus {
        self.status
    }

    fn poll(&mut self, now_ms: u32) -> ModemStatus {
        self.step(now_ms);
        self.status
    }

    fn send_sms(&mut self, recipient: &str, body: &str) -> Result<(), ModemError> {
        if self.status != ModemStatus::SmsReady {
            return Err(ModemError::NotReady);
        }
        if body.len() > SMS_MAX_LEN {
            return Err(ModemError::MessageTooLong);
        }
        info!("SMS -> {} ({} chars)", recipient, body.len());
        match self.send_sequence(recipient, body) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) => {
                warn!("SMS to {} failed: {}", recipient, e);
                Err(e)
            }
        }
    }
}
