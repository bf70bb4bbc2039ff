//! Modem session against a behavioural SIM800L simulator.
//!
//! Unlike the scripted fake in the unit tests, [`SimModem`] parses each
//! command line and answers from its own state (power, registration,
//! pending message body), so these tests exercise the session the way the
//! real module drives it.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::mock_hw::{MockBoard, RecordingSink, TICK_MS};

use petfeeder::app::events::AppEvent;
use petfeeder::app::ports::{ModemTransport, SmsLink, TimePort};
use petfeeder::app::service::FeederService;
use petfeeder::config::SystemConfig;
use petfeeder::error::ModemError;
use petfeeder::gsm::at::{CTRL_Z, ESC};
use petfeeder::gsm::session::{ModemSession, SessionTimings};
use petfeeder::gsm::{ModemStatus, Priority};

// ── Simulator ─────────────────────────────────────────────────

#[derive(Default)]
struct SimModem {
    /// Answers nothing while unpowered.
    powered: bool,
    /// A reset does not bring it back.
    dead: bool,
    registered: bool,
    reject_cmgs: bool,
    line: Vec<u8>,
    rx: VecDeque<u8>,
    /// Recipient of the message whose body is being typed.
    awaiting_body: Option<String>,
    commands: Vec<String>,
    messages: Vec<(String, String)>,
    resets: u32,
}

impl SimModem {
    fn registered() -> Self {
        Self {
            registered: true,
            ..Self::default()
        }
    }

    fn answer(&mut self, reply: &str) {
        self.rx.extend(reply.bytes());
    }

    fn on_line(&mut self) {
        let text = String::from_utf8_lossy(&self.line).trim_end_matches('\r').to_string();
        self.line.clear();
        if text.is_empty() {
            return;
        }
        self.commands.push(text.clone());

        match text.as_str() {
            "AT" | "AT+CMGF=1" => self.answer("\r\nOK\r\n"),
            "AT+CREG?" => {
                let stat = if self.registered { 1 } else { 2 };
                self.answer(&format!("\r\n+CREG: 0,{stat}\r\n\r\nOK\r\n"));
            }
            cmd if cmd.starts_with("AT+CMGS=\"") => {
                if self.reject_cmgs {
                    self.answer("\r\nERROR\r\n");
                } else {
                    let number = cmd.trim_start_matches("AT+CMGS=\"").trim_end_matches('"');
                    self.awaiting_body = Some(number.to_string());
                    self.answer("\r\n> ");
                }
            }
            _ => self.answer("\r\nERROR\r\n"),
        }
    }

    fn on_submit(&mut self) {
        let body = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        if let Some(to) = self.awaiting_body.take() {
            self.messages.push((to, body));
            self.answer("\r\n+CMGS: 7\r\n\r\nOK\r\n");
        }
    }
}

impl ModemTransport for SimModem {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        if !self.powered {
            return Ok(());
        }
        for &b in bytes {
            match b {
                CTRL_Z => self.on_submit(),
                ESC => {
                    self.line.clear();
                    self.awaiting_body = None;
                }
                b'\n' if self.awaiting_body.is_none() => self.on_line(),
                _ => self.line.push(b),
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len());
        for (slot, b) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = b;
        }
        n
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.powered = !self.dead;
        self.line.clear();
        self.rx.clear();
        self.awaiting_body = None;
    }
}

/// Advances one millisecond per reading, so AT timeouts terminate.
#[derive(Clone, Default)]
struct SimClock(Rc<Cell<u32>>);

impl TimePort for SimClock {
    fn now_ms(&self) -> u32 {
        let t = self.0.get();
        self.0.set(t.wrapping_add(1));
        t
    }
}

type Session = ModemSession<SimModem, SimClock>;

fn session(modem: SimModem) -> Session {
    let timings = SessionTimings::from(&SystemConfig::default());
    ModemSession::new(modem, SimClock::default(), timings)
}

fn ready_session() -> Session {
    let mut s = session(SimModem::registered());
    s.begin(0);
    s.poll(0);
    s.poll(10);
    assert_eq!(s.poll(20), ModemStatus::SmsReady);
    s
}

// ── Session ───────────────────────────────────────────────────

#[test]
fn registered_modem_is_ready_after_three_polls() {
    let mut s = session(SimModem::registered());
    s.begin(0);
    assert_eq!(s.poll(0), ModemStatus::NetworkSearching);
    assert_eq!(s.poll(10_000), ModemStatus::NetworkConnected);
    assert_eq!(s.poll(20_000), ModemStatus::SmsReady);
    assert_eq!(
        s.transport().commands,
        ["AT", "AT+CMGF=1", "AT+CREG?", "AT+CMGF=1"]
    );
}

#[test]
fn late_registration_is_picked_up() {
    let mut s = session(SimModem::default());
    s.begin(0);
    s.poll(0);
    assert_eq!(s.poll(10_000), ModemStatus::NetworkSearching);
    assert_eq!(s.poll(20_000), ModemStatus::NetworkSearching);

    s.transport_mut().registered = true;
    assert_eq!(s.poll(30_000), ModemStatus::NetworkConnected);
    assert_eq!(s.poll(40_000), ModemStatus::SmsReady);
}

#[test]
fn never_registering_ends_in_error() {
    let mut s = session(SimModem::default());
    s.begin(0);
    s.poll(0);
    assert_eq!(s.poll(50_000), ModemStatus::NetworkSearching);
    assert_eq!(s.poll(60_001), ModemStatus::Error);
}

#[test]
fn message_reaches_the_network() {
    let mut s = ready_session();
    assert_eq!(s.send_sms("+639291145133", "Hopper low"), Ok(()));
    assert_eq!(
        s.transport().messages,
        [("+639291145133".to_string(), "Hopper low".to_string())]
    );
    assert_eq!(s.sent_count(), 1);
    assert_eq!(s.status(), ModemStatus::SmsReady);
}

#[test]
fn refused_submission_is_cancelled_and_next_send_works() {
    let mut s = ready_session();
    s.transport_mut().reject_cmgs = true;
    assert_eq!(
        s.send_sms("+639291145133", "first"),
        Err(ModemError::ErrorResponse)
    );
    assert!(s.transport().messages.is_empty());

    s.transport_mut().reject_cmgs = false;
    assert_eq!(s.send_sms("+639291145133", "second"), Ok(()));
    assert_eq!(s.transport().messages.len(), 1);
    assert_eq!(s.transport().messages[0].1, "second");
}

#[test]
fn brownout_is_detected_and_recovered() {
    let mut s = ready_session();
    s.transport_mut().powered = false;

    // Probe is due one liveness interval after becoming ready.
    assert_eq!(s.poll(30_000), ModemStatus::SmsReady);
    assert_eq!(s.poll(60_100), ModemStatus::Initializing);
    assert_eq!(s.poll(70_000), ModemStatus::Initializing);
    assert_eq!(s.poll(90_200), ModemStatus::Error);

    // Recovery waits out its interval, then resets the module.
    assert_eq!(s.poll(100_000), ModemStatus::Error);
    assert_eq!(s.poll(120_300), ModemStatus::Initializing);
    assert_eq!(s.transport().resets, 2);

    s.poll(120_310);
    s.poll(120_320);
    assert_eq!(s.poll(120_330), ModemStatus::SmsReady);
}

#[test]
fn dead_modem_keeps_cycling_through_recovery() {
    let mut s = session(SimModem {
        dead: true,
        ..SimModem::registered()
    });
    s.begin(0);
    assert_eq!(s.poll(30_001), ModemStatus::Error);
    assert_eq!(s.poll(60_001), ModemStatus::Initializing);
    assert_eq!(s.poll(90_002), ModemStatus::Error);
    assert_eq!(s.poll(120_002), ModemStatus::Initializing);
    assert_eq!(s.transport().resets, 3);
    assert_eq!(s.send_sms("+639291145133", "x"), Err(ModemError::NotReady));
}

// ── Full stack ────────────────────────────────────────────────

#[test]
fn manual_feed_alert_is_delivered_once_the_modem_comes_up() {
    let config = SystemConfig::default();
    let mut link = session(SimModem::registered());
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    let mut svc = FeederService::new(config, hw.now());

    svc.start(&mut hw, &mut sink);
    link.begin(hw.now());

    hw.feed_level = false;
    svc.tick(&mut hw, &mut link, &mut sink);
    hw.advance_ms(TICK_MS);
    hw.feed_level = true;
    svc.tick(&mut hw, &mut link, &mut sink);
    assert_eq!(svc.sms_pending(), 1);

    let end = hw.now() + 60_000;
    while link.transport().messages.is_empty() && hw.now() < end {
        hw.advance_ms(TICK_MS);
        svc.tick(&mut hw, &mut link, &mut sink);
    }

    let messages = &link.transport().messages;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "+639291145133");
    assert!(messages[0].1.contains("Manual feed"));
    assert_eq!(svc.sms_pending(), 0);

    assert!(sink.any(|e| matches!(
        e,
        AppEvent::ModemStatusChanged {
            to: ModemStatus::SmsReady,
            ..
        }
    )));
    assert!(sink.any(|e| matches!(e, AppEvent::SmsSent(Priority::High))));
}
