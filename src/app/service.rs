//! Application service: the hexagonal core.
//!
//! [`FeederService`] owns every domain component and runs them once per
//! loop iteration in a fixed order.  All I/O flows through port traits
//! injected at call sites, so the whole service runs on the host against
//! mock adapters.
//!
//! ```text
//!                  ┌──────────────────────────────────────┐
//!  InputPort   ──▶ │            FeederService             │ ──▶ EventSink
//!  DistanceBus ──▶ │  buttons · sensors · policy · motion │
//!  MotorPort   ◀── │  safety · scheduler · SMS dispatcher │ ◀─▶ SmsLink
//!  BuzzerPort  ◀── └──────────────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. buttons (manual feed, mode toggle)
//! 2. emergency-stop flag and feeding timeout
//! 3. sensor read and classification (scheduled)
//! 4. auto-feed policy (scheduled)
//! 5. one motor slice
//! 6. modem session poll (scheduled, held while dispensing)
//! 7. SMS queue drain (held while dispensing)
//! 8. status report (scheduled, Idle only)

use log::{info, warn};

use crate::autofeed::AutoFeedPolicy;
use crate::config::{FeedingMode, SystemConfig};
use crate::control::motion::{self, FeedKind, MotionController, MotionStatus};
use crate::drivers::button::EdgeDetector;
use crate::drivers::buzzer;
use crate::error::{Error, MotorError, SafetyFault};
use crate::fsm::StateId;
use crate::gsm::dispatcher::{DrainOutcome, SmsDispatcher};
use crate::gsm::message::{SmsAlert, StatusSummary, normalize_recipient};
use crate::gsm::queue::SmsItem;
use crate::gsm::{ModemStatus, Priority};
use crate::safety::SafetySupervisor;
use crate::scheduler::{Scheduler, TaskId};
use crate::sensors::level::LevelTransition;
use crate::sensors::{SensorHub, SensorReport};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusReport};
use super::ports::{EventSink, FeederHardware, Input, SmsLink};

const TIMEOUT_REASON: &str = "Feeding timeout, motor stopped.";

// ───────────────────────────────────────────────────────────────
// SystemState
// ───────────────────────────────────────────────────────────────

/// Externally visible feeder state, derived after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Idle,
    /// The bowl reads empty and the auto-feed policy is watching it.
    CheckingBowl,
    /// Automatic dispense running.
    Dispensing,
    AlertEmptyHopper,
    /// Button-triggered dispense running.
    ManualFeeding,
    /// A latched fault blocks feeding.
    ErrorState,
}

impl SystemState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::CheckingBowl => "CHECKING_BOWL",
            Self::Dispensing => "DISPENSING",
            Self::AlertEmptyHopper => "ALERT_EMPTY_HOPPER",
            Self::ManualFeeding => "MANUAL_FEEDING",
            Self::ErrorState => "ERROR",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// FeederService
// ───────────────────────────────────────────────────────────────

pub struct FeederService {
    config: SystemConfig,
    state: SystemState,
    feed_button: EdgeDetector,
    mode_button: EdgeDetector,
    sensors: SensorHub,
    motion: MotionController,
    policy: AutoFeedPolicy,
    safety: SafetySupervisor,
    scheduler: Scheduler,
    sms: SmsDispatcher,
    modem_status: ModemStatus,
    tick_count: u64,
}

impl FeederService {
    /// Build every component.  Intervals and the daily window start at
    /// `now_ms`.  Call [`start`](Self::start) before the first tick.
    pub fn new(config: SystemConfig, now_ms: u32) -> Self {
        Self {
            state: SystemState::Idle,
            feed_button: EdgeDetector::new(config.debounce_ms),
            mode_button: EdgeDetector::new(config.debounce_ms),
            sensors: SensorHub::new(&config),
            motion: MotionController::new(config.motor_steps_per_slice),
            policy: AutoFeedPolicy::new(&config, now_ms),
            safety: SafetySupervisor::new(&config),
            scheduler: Scheduler::new(&config, now_ms),
            sms: SmsDispatcher::new(&config),
            modem_status: ModemStatus::Offline,
            tick_count: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: startup chirp, sensor probe and first reading.
    pub fn start(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink) {
        hw.play(&buzzer::STARTUP);
        let now = hw.now_ms();
        let report = self.sensors.begin(hw, now);
        self.apply_sensor_report(report, hw, sink, now);

        sink.emit(&AppEvent::Started {
            mode: self.policy.mode(),
            sensor_online: self.sensors.is_online(),
        });
        info!(
            "Feeder started: mode {}, auto-feed {}, sensor {}",
            self.policy.mode().label(),
            if self.policy.is_enabled() { "on" } else { "off" },
            if self.sensors.is_online() { "online" } else { "offline" }
        );
        self.update_state(sink);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration.
    pub fn tick(
        &mut self,
        hw: &mut impl FeederHardware,
        link: &mut impl SmsLink,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = hw.now_ms();

        // 1. Buttons
        let feed_level = hw.read_level(Input::FeedButton);
        if self.feed_button.poll(feed_level, now) {
            info!("Feed button pressed");
            if let Err(e) = self.manual_feed(hw, sink, now) {
                warn!("Feed button press ignored: {}", e);
            }
        }
        let mode_level = hw.read_level(Input::ModeButton);
        if self.mode_button.poll(mode_level, now) {
            self.set_mode(self.policy.mode().toggled(), hw, sink);
        }

        // 2. Emergency stop and feeding timeout
        if motion::take_emergency_stop_request() {
            self.emergency_stop(hw, sink);
        }
        if self.safety.dispense_overdue(self.motion.running_for_ms(now)) {
            self.feed_timeout(hw, sink, now);
        }

        let due = self.scheduler.due(now);

        // 3. Sensors
        if due.contains(&TaskId::SensorRead) {
            let report = self.sensors.poll(hw, now);
            self.apply_sensor_report(report, hw, sink, now);
        }

        // 4. Auto-feed policy
        if due.contains(&TaskId::AutoFeedCheck) {
            self.run_policy(hw, sink, now);
        }

        // 5. Motor slice
        let status = self.motion.service(now, hw);
        self.apply_motion_status(status, hw, sink);

        // 6-7. Modem and SMS queue.  Both can block for seconds, so they
        // wait while the motor runs; a poll that falls due meanwhile runs
        // on the first tick after the dispense.
        if self.motion.is_busy() {
            if due.contains(&TaskId::ModemPoll) {
                self.scheduler.run_soon(TaskId::ModemPoll);
            }
        } else {
            if due.contains(&TaskId::ModemPoll) {
                link.poll(now);
            }
            match self.sms.drain(now, link) {
                DrainOutcome::Sent(priority) => sink.emit(&AppEvent::SmsSent(priority)),
                DrainOutcome::Failed(priority, error) => {
                    sink.emit(&AppEvent::SmsFailed { priority, error })
                }
                DrainOutcome::Empty | DrainOutcome::NotReady | DrainOutcome::Deferred => {}
            }
        }
        self.track_modem(link.status(), sink);

        self.update_state(sink);

        // 8. Status
        if due.contains(&TaskId::StatusReport) && self.state == SystemState::Idle {
            let report = self.status_report();
            info!(
                "Status: {} {} fed {}/{} sms {} modem {}",
                report.state.label(),
                report.mode.label(),
                report.fed_today,
                report.max_daily,
                report.sms_pending,
                report.modem.label()
            );
            sink.emit(&AppEvent::Status(report));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let now = hw.now_ms();
        let result = match cmd {
            AppCommand::ManualFeed => self.manual_feed(hw, sink, now).map_err(Error::from),
            AppCommand::ToggleMode => {
                self.set_mode(self.policy.mode().toggled(), hw, sink);
                Ok(())
            }
            AppCommand::SetMode(mode) => {
                if mode != self.policy.mode() {
                    self.set_mode(mode, hw, sink);
                }
                Ok(())
            }
            AppCommand::SetAutoFeed(enabled) => {
                if enabled != self.policy.is_enabled() {
                    self.policy.set_enabled(enabled);
                    sink.emit(&AppEvent::AutoFeedToggled(enabled));
                }
                Ok(())
            }
            AppCommand::EmergencyStop => {
                self.emergency_stop(hw, sink);
                Ok(())
            }
            AppCommand::ClearFaults => {
                for fault in self.safety.clear_latched() {
                    sink.emit(&AppEvent::FaultCleared(fault));
                }
                Ok(())
            }
            AppCommand::SendStatus => {
                let report = self.status_report();
                sink.emit(&AppEvent::Status(report));
                self.enqueue_alert(SmsAlert::SystemStatus(summary(&report)), now, sink);
                Ok(())
            }
            AppCommand::SendSms {
                recipient,
                body,
                priority,
            } => normalize_recipient(&recipient)
                .map(|to| self.enqueue_sms(&to, &body, priority, now, sink))
                .map_err(Error::from),
        };
        self.update_state(sink);
        result
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn mode(&self) -> FeedingMode {
        self.policy.mode()
    }

    pub fn policy_state(&self) -> StateId {
        self.policy.state()
    }

    pub fn auto_feed_enabled(&self) -> bool {
        self.policy.is_enabled()
    }

    pub fn daily_feeds(&self) -> u32 {
        self.policy.daily_count()
    }

    pub fn is_dispensing(&self) -> bool {
        self.motion.is_busy()
    }

    pub fn fault_flags(&self) -> u8 {
        self.safety.faults()
    }

    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.safety.has_fault(fault)
    }

    pub fn sms_pending(&self) -> usize {
        self.sms.pending()
    }

    pub fn sms_dispatcher(&self) -> &SmsDispatcher {
        &self.sms
    }

    pub fn sensors(&self) -> &SensorHub {
        &self.sensors
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            state: self.state,
            mode: self.policy.mode(),
            auto_feed: self.policy.is_enabled(),
            fed_today: self.policy.daily_count(),
            max_daily: self.policy.max_daily(),
            distance_cm: self.sensors.last_good().map(|s| s.value_cm),
            bowl_empty: self.sensors.bowl_empty(),
            hopper_low: self.sensors.hopper_low(),
            sensor_online: self.sensors.is_online(),
            modem: self.modem_status,
            sms_pending: self.sms.pending(),
            fault_flags: self.safety.faults(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn manual_feed(
        &mut self,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
        now: u32,
    ) -> Result<(), MotorError> {
        let rejection = if self.safety.blocks_feeding() {
            Some(MotorError::Faulted)
        } else if self.motion.is_busy() {
            Some(MotorError::Busy)
        } else {
            None
        };
        if let Some(reason) = rejection {
            warn!("Manual feed rejected: {}", reason);
            hw.play(&buzzer::REJECTED);
            sink.emit(&AppEvent::FeedRejected {
                kind: FeedKind::Manual,
                reason,
            });
            return Err(reason);
        }

        let mode = self.policy.mode();
        let steps = self.config.portion(mode).manual();
        hw.play(&buzzer::MANUAL_FEED);
        self.start_dispense(steps, FeedKind::Manual, hw, sink, now)?;
        let grams = self.config.steps_to_grams(steps) as u32;
        self.enqueue_alert(SmsAlert::ManualFeed { mode, grams }, now, sink);
        Ok(())
    }

    fn start_dispense(
        &mut self,
        steps: u32,
        kind: FeedKind,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
        now: u32,
    ) -> Result<(), MotorError> {
        let request = self.config.motion_request(steps);
        match self.motion.start(&request, kind, now, hw) {
            Ok(_) => {
                sink.emit(&AppEvent::FeedStarted {
                    kind,
                    steps,
                    grams: self.config.steps_to_grams(steps),
                });
                Ok(())
            }
            Err(reason) => {
                warn!("{:?} dispense rejected: {}", kind, reason);
                sink.emit(&AppEvent::FeedRejected { kind, reason });
                Err(reason)
            }
        }
    }

    fn set_mode(&mut self, mode: FeedingMode, hw: &mut impl FeederHardware, sink: &mut impl EventSink) {
        self.policy.set_mode(mode);
        let band = self.config.portion(mode);
        info!(
            "Mode {}: {}-{} steps ({:.0}-{:.0} g)",
            mode.label(),
            band.min_steps,
            band.max_steps,
            self.config.steps_to_grams(band.min_steps),
            self.config.steps_to_grams(band.max_steps)
        );
        hw.play(buzzer::mode_pattern(mode));
        sink.emit(&AppEvent::ModeChanged(mode));
    }

    /// Abort any dispense and announce the stop.
    fn halt_motor(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink) {
        if let Some(status) = self.motion.abort(hw) {
            self.apply_motion_status(status, hw, sink);
        }
        sink.emit(&AppEvent::EmergencyStop);
        hw.play(&buzzer::EMERGENCY_STOP);
    }

    fn emergency_stop(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink) {
        warn!("EMERGENCY STOP");
        self.halt_motor(hw, sink);
        if self.safety.raise(SafetyFault::EmergencyStop) {
            sink.emit(&AppEvent::FaultRaised(SafetyFault::EmergencyStop));
        }
    }

    fn feed_timeout(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink, now: u32) {
        warn!("Dispense exceeded {} ms, stopping", self.config.feeding_timeout_ms);
        self.halt_motor(hw, sink);
        if self.safety.raise(SafetyFault::FeedTimeout) {
            sink.emit(&AppEvent::FaultRaised(SafetyFault::FeedTimeout));
        }
        self.enqueue_alert(SmsAlert::FeedingError { reason: TIMEOUT_REASON }, now, sink);
    }

    fn apply_motion_status(
        &mut self,
        status: MotionStatus,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        match status {
            MotionStatus::Completed { kind, steps } => {
                hw.play(&buzzer::FEED_DONE);
                sink.emit(&AppEvent::FeedCompleted { kind, steps });
            }
            MotionStatus::Aborted { kind, done, total } => {
                sink.emit(&AppEvent::FeedAborted { kind, done, total });
            }
            MotionStatus::Idle | MotionStatus::Running { .. } => {}
        }
    }

    fn apply_sensor_report(
        &mut self,
        report: SensorReport,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
        now: u32,
    ) {
        if let Some(e) = report.error {
            sink.emit(&AppEvent::SensorFailed(e));
        }
        let distance_cm = report.sample.value_cm;

        match report.bowl {
            Some(LevelTransition::BecameEmpty) => {
                info!("Bowl empty ({:.1} cm)", distance_cm);
                hw.play(&buzzer::BOWL_EMPTY);
                sink.emit(&AppEvent::BowlEmpty { distance_cm });
            }
            Some(LevelTransition::BecameFull) => {
                info!("Bowl filled ({:.1} cm)", distance_cm);
                hw.play(&buzzer::BOWL_FILLED);
                sink.emit(&AppEvent::BowlFilled { distance_cm });
            }
            None => {}
        }

        match report.hopper {
            Some(LevelTransition::BecameEmpty) => {
                warn!("Hopper low ({:.1} cm)", distance_cm);
                hw.play(&buzzer::HOPPER_LOW);
                sink.emit(&AppEvent::HopperLow { distance_cm });
                self.enqueue_alert(SmsAlert::HopperLow, now, sink);
            }
            Some(LevelTransition::BecameFull) => {
                info!("Hopper refilled ({:.1} cm)", distance_cm);
                hw.play(&buzzer::HOPPER_REFILLED);
                sink.emit(&AppEvent::HopperRefilled { distance_cm });
            }
            None => {}
        }

        if let Some(offline) = report.offline_changed {
            match self.safety.set_sensor_offline(offline) {
                Some(true) => sink.emit(&AppEvent::FaultRaised(SafetyFault::SensorOffline)),
                Some(false) => sink.emit(&AppEvent::FaultCleared(SafetyFault::SensorOffline)),
                None => {}
            }
        }
    }

    fn run_policy(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink, now: u32) {
        let feeder_ready = !self.motion.is_busy() && !self.safety.blocks_auto_feed();
        let out = self.policy.poll(now, self.sensors.bowl_empty(), feeder_ready);

        if out.confirm_cue {
            hw.play(&buzzer::EMPTY_CONFIRMED);
            sink.emit(&AppEvent::EmptyConfirmed);
        }

        let fed = match out.feed {
            Some(request) => {
                hw.play(&buzzer::AUTO_FEED);
                self.start_dispense(request.total_steps, FeedKind::Auto, hw, sink, now)
                    .is_ok()
            }
            None => false,
        };

        for alert in out.alerts {
            match alert {
                SmsAlert::AutoFeed { .. } if !fed => continue,
                SmsAlert::DailyReset => sink.emit(&AppEvent::DailyReset),
                SmsAlert::QuotaExhausted {
                    fed_today,
                    max_daily,
                } => sink.emit(&AppEvent::QuotaExhausted {
                    fed_today,
                    max_daily,
                }),
                _ => {}
            }
            self.enqueue_alert(alert, now, sink);
        }
    }

    fn enqueue_alert(&mut self, alert: SmsAlert, now: u32, sink: &mut impl EventSink) {
        let body = alert.render(now);
        let recipient = self.config.alert_recipient.clone();
        self.enqueue_sms(&recipient, &body, alert.priority(), now, sink);
    }

    fn enqueue_sms(
        &mut self,
        recipient: &str,
        body: &str,
        priority: Priority,
        now: u32,
        sink: &mut impl EventSink,
    ) {
        match SmsItem::new(recipient, body, priority, now) {
            Ok(item) => {
                let admission = self.sms.enqueue(item);
                sink.emit(&AppEvent::SmsQueued {
                    priority,
                    admission,
                });
            }
            Err(e) => warn!("SMS not queued: {}", e),
        }
    }

    fn track_modem(&mut self, status: ModemStatus, sink: &mut impl EventSink) {
        if status != self.modem_status {
            sink.emit(&AppEvent::ModemStatusChanged {
                from: self.modem_status,
                to: status,
            });
            self.modem_status = status;
        }
    }

    fn derive_state(&self) -> SystemState {
        if self.safety.blocks_feeding() {
            return SystemState::ErrorState;
        }
        match self.motion.active_kind() {
            Some(FeedKind::Manual) => SystemState::ManualFeeding,
            Some(FeedKind::Auto) => SystemState::Dispensing,
            None if matches!(
                self.policy.state(),
                StateId::ConfirmingEmpty | StateId::ReadyToFeed | StateId::Suppressed
            ) =>
            {
                SystemState::CheckingBowl
            }
            None if self.sensors.hopper_low() => SystemState::AlertEmptyHopper,
            None => SystemState::Idle,
        }
    }

    fn update_state(&mut self, sink: &mut impl EventSink) {
        let next = self.derive_state();
        if next != self.state {
            info!("State: {} -> {}", self.state.label(), next.label());
            sink.emit(&AppEvent::SystemStateChanged {
                from: self.state,
                to: next,
            });
            self.state = next;
        }
    }
}

fn summary(report: &StatusReport) -> StatusSummary {
    StatusSummary {
        mode: report.mode,
        auto_feed: report.auto_feed,
        fed_today: report.fed_today,
        max_daily: report.max_daily,
        bowl_empty: report.bowl_empty,
        hopper_low: report.hopper_low,
        sensor_online: report.sensor_online,
    }
}
