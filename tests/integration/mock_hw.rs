//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching real GPIO, I2C or UART.  The board keeps a simulated
//! clock that every busy wait advances (tones, sensor settle time, step
//! pulses), so dispense durations come out the same as on hardware.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use petfeeder::app::events::AppEvent;
use petfeeder::app::ports::{
    BusError, BuzzerPort, DistanceBus, EventSink, Input, InputPort, MotorPort, SmsLink, TimePort,
    Tone,
};
use petfeeder::app::service::FeederService;
use petfeeder::config::SystemConfig;
use petfeeder::error::ModemError;
use petfeeder::gsm::ModemStatus;

/// Loop period used by [`Rig::run_for`].
pub const TICK_MS: u32 = 10;

// ── Motor call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCall {
    Enable,
    Disable,
    Direction(bool),
}

// ── MockBoard ─────────────────────────────────────────────────

/// Simulated microsecond clock, shared with [`MockLink`] when the link
/// should model blocking AT exchanges.
pub type SharedClock = Rc<Cell<u64>>;

pub struct MockBoard {
    now_us: SharedClock,
    pub feed_level: bool,
    pub mode_level: bool,
    /// `None` = no sensor on the bus (every transaction NACKs).
    pub distance_mm: Option<u16>,
    pub motor_enabled: bool,
    pub motor_calls: Vec<MotorCall>,
    pub pulses: u32,
    pub patterns: Vec<Vec<Tone>>,
    pub reinits: u32,
}

impl MockBoard {
    /// Sensor present, reading a well-filled bowl (5 cm).
    pub fn new() -> Self {
        Self {
            now_us: SharedClock::default(),
            feed_level: true,
            mode_level: true,
            distance_mm: Some(50),
            motor_enabled: false,
            motor_calls: Vec::new(),
            pulses: 0,
            patterns: Vec::new(),
            reinits: 0,
        }
    }

    pub fn now(&self) -> u32 {
        (self.now_us.get() / 1000) as u32
    }

    pub fn set_now_ms(&mut self, ms: u32) {
        self.now_us.set(u64::from(ms) * 1000);
    }

    pub fn advance_ms(&mut self, ms: u32) {
        self.advance_us(u64::from(ms) * 1000);
    }

    fn advance_us(&mut self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }

    pub fn clock(&self) -> SharedClock {
        Rc::clone(&self.now_us)
    }

    pub fn set_distance_cm(&mut self, cm: f32) {
        self.distance_mm = Some((cm * 10.0) as u16);
    }

    pub fn played(&self, pattern: &[Tone]) -> bool {
        self.patterns.iter().any(|p| p.as_slice() == pattern)
    }

    pub fn times_played(&self, pattern: &[Tone]) -> usize {
        self.patterns.iter().filter(|p| p.as_slice() == pattern).count()
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePort for MockBoard {
    fn now_ms(&self) -> u32 {
        self.now()
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_us(u64::from(ns) / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance_us(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance_ms(ms);
    }
}

impl InputPort for MockBoard {
    fn read_level(&mut self, input: Input) -> bool {
        match input {
            Input::FeedButton => self.feed_level,
            Input::ModeButton => self.mode_level,
        }
    }
}

impl MotorPort for MockBoard {
    fn enable(&mut self) {
        self.motor_enabled = true;
        self.motor_calls.push(MotorCall::Enable);
    }

    fn disable(&mut self) {
        self.motor_enabled = false;
        self.motor_calls.push(MotorCall::Disable);
    }

    fn set_direction(&mut self, forward: bool) {
        self.motor_calls.push(MotorCall::Direction(forward));
    }

    fn pulse(&mut self, period_us: u32) {
        assert!(self.motor_enabled, "pulse while the driver is disabled");
        self.pulses += 1;
        self.advance_us(u64::from(period_us));
    }
}

impl BuzzerPort for MockBoard {
    fn play(&mut self, pattern: &[Tone]) {
        self.patterns.push(pattern.to_vec());
        let total: u32 = pattern.iter().map(|t| t.duration_ms + t.gap_ms).sum();
        self.advance_ms(total);
    }
}

impl DistanceBus for MockBoard {
    fn write(&mut self, _addr: u8, _bytes: &[u8]) -> Result<(), BusError> {
        self.distance_mm.map(|_| ()).ok_or(BusError::Nack)
    }

    fn read(&mut self, _addr: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        let mm = self.distance_mm.ok_or(BusError::Nack)?;
        let [hi, lo] = mm.to_be_bytes();
        let frame = [hi, lo, hi.wrapping_add(lo)];
        let n = buf.len().min(frame.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn reinit(&mut self) {
        self.reinits += 1;
    }
}

// ── MockLink ──────────────────────────────────────────────────

/// Scripted modem session: the status is set by the test, sends are
/// recorded.  With a clock attached, every poll and send attempt holds
/// the loop for its configured cost, like the real AT exchanges do.
pub struct MockLink {
    pub status: ModemStatus,
    pub sent: Vec<(String, String)>,
    pub fail_sends: bool,
    pub polls: u32,
    clock: Option<SharedClock>,
    poll_cost_ms: u32,
    send_cost_ms: u32,
}

impl MockLink {
    pub fn ready() -> Self {
        Self {
            status: ModemStatus::SmsReady,
            sent: Vec::new(),
            fail_sends: false,
            polls: 0,
            clock: None,
            poll_cost_ms: 0,
            send_cost_ms: 0,
        }
    }

    pub fn offline() -> Self {
        Self {
            status: ModemStatus::Offline,
            ..Self::ready()
        }
    }

    pub fn bodies_containing(&self, needle: &str) -> usize {
        self.sent.iter().filter(|(_, body)| body.contains(needle)).count()
    }

    /// Make polls and sends consume simulated time on `clock`.
    pub fn blocking(mut self, clock: SharedClock, poll_cost_ms: u32, send_cost_ms: u32) -> Self {
        self.clock = Some(clock);
        self.poll_cost_ms = poll_cost_ms;
        self.send_cost_ms = send_cost_ms;
        self
    }

    fn spend(&self, ms: u32) {
        if let Some(clock) = &self.clock {
            clock.set(clock.get() + u64::from(ms) * 1000);
        }
    }
}

impl SmsLink for MockLink {
    fn status(&self) -> ModemStatus {
        self.status
    }

    fn poll(&mut self, _now_ms: u32) -> ModemStatus {
        self.polls += 1;
        self.spend(self.poll_cost_ms);
        self.status
    }

    fn send_sms(&mut self, recipient: &str, body: &str) -> Result<(), ModemError> {
        if self.status != ModemStatus::SmsReady {
            return Err(ModemError::NotReady);
        }
        self.spend(self.send_cost_ms);
        if self.fail_sends {
            return Err(ModemError::Timeout);
        }
        self.sent.push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Collects events for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn any(&self, pred: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }

    /// Index of the first matching event.
    pub fn position(&self, pred: impl Fn(&AppEvent) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// A service wired to the three mocks.
pub struct Rig {
    pub svc: FeederService,
    pub hw: MockBoard,
    pub link: MockLink,
    pub sink: RecordingSink,
}

impl Rig {
    pub fn new(config: SystemConfig) -> Self {
        Self::with_board(config, MockBoard::new())
    }

    pub fn with_board(config: SystemConfig, hw: MockBoard) -> Self {
        let svc = FeederService::new(config, hw.now());
        Self {
            svc,
            hw,
            link: MockLink::ready(),
            sink: RecordingSink::new(),
        }
    }

    /// Default config, started.
    pub fn started() -> Self {
        let mut rig = Self::new(SystemConfig::default());
        rig.start();
        rig
    }

    pub fn start(&mut self) {
        self.svc.start(&mut self.hw, &mut self.sink);
    }

    pub fn tick(&mut self) {
        self.svc.tick(&mut self.hw, &mut self.link, &mut self.sink);
    }

    /// Run the loop for `ms` of simulated time, pausing [`TICK_MS`]
    /// between iterations like the firmware loop.
    pub fn run_for(&mut self, ms: u32) {
        let end = self.hw.now().wrapping_add(ms);
        while (end.wrapping_sub(self.hw.now()) as i32) > 0 {
            self.tick();
            self.hw.advance_ms(TICK_MS);
        }
    }

    /// Run until `pred` holds or `limit_ms` passes.  Returns whether it held.
    pub fn run_until(&mut self, limit_ms: u32, pred: impl Fn(&Rig) -> bool) -> bool {
        let end = self.hw.now().wrapping_add(limit_ms);
        while (end.wrapping_sub(self.hw.now()) as i32) > 0 {
            self.tick();
            if pred(self) {
                return true;
            }
            self.hw.advance_ms(TICK_MS);
        }
        false
    }

    /// Hold the feed button for two ticks.
    pub fn press_feed(&mut self) {
        self.hw.feed_level = false;
        self.tick();
        self.hw.advance_ms(TICK_MS);
        self.hw.feed_level = true;
        self.tick();
    }

    pub fn press_mode(&mut self) {
        self.hw.mode_level = false;
        self.tick();
        self.hw.advance_ms(TICK_MS);
        self.hw.mode_level = true;
        self.tick();
    }
}
