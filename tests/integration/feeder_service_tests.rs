//! Integration tests for the FeederService → sensors / policy / motion /
//! SMS pipeline.
//!
//! These run on the host (x86_64) against the mock board and verify whole
//! behaviours over simulated time: a bowl going empty and being fed, the
//! daily quota, faults, button presses and the alerts they queue.

use crate::mock_hw::{MockBoard, MockLink, Rig};

use petfeeder::app::commands::AppCommand;
use petfeeder::app::events::AppEvent;
use petfeeder::app::service::SystemState;
use petfeeder::config::{FeedingMode, SystemConfig};
use petfeeder::control::motion::FeedKind;
use petfeeder::drivers::buzzer;
use petfeeder::error::{Error, MotorError, SafetyFault};
use petfeeder::fsm::StateId;
use petfeeder::gsm::queue::{Recipient, SmsBody};
use petfeeder::gsm::{ModemStatus, Priority};

fn auto_feeds(rig: &Rig) -> usize {
    rig.sink.count(|e| {
        matches!(
            e,
            AppEvent::FeedStarted {
                kind: FeedKind::Auto,
                ..
            }
        )
    })
}

// ── Boot ─────────────────────────────────────────────────────

#[test]
fn start_chirps_probes_sensor_and_reports() {
    let rig = Rig::started();

    assert_eq!(rig.hw.patterns.first().map(Vec::as_slice), Some(&buzzer::STARTUP[..]));
    assert!(rig.sink.any(|e| *e
        == AppEvent::Started {
            mode: FeedingMode::Cat,
            sensor_online: true
        }));
    assert_eq!(rig.svc.state(), SystemState::Idle);
    assert_eq!(rig.svc.sensors().last_good().map(|s| s.value_cm), Some(5.0));
}

#[test]
fn absent_sensor_raises_offline_fault_but_allows_manual_feed() {
    let mut hw = MockBoard::new();
    hw.distance_mm = None;
    let mut rig = Rig::with_board(SystemConfig::default(), hw);
    rig.start();

    assert!(rig.sink.any(|e| *e == AppEvent::FaultRaised(SafetyFault::SensorOffline)));
    assert!(rig.svc.has_fault(SafetyFault::SensorOffline));
    assert!(!rig.svc.status_report().sensor_online);
    // Not latched: the feeder is not in the error state.
    assert_eq!(rig.svc.state(), SystemState::Idle);

    assert_eq!(rig.svc.handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink), Ok(()));
    assert!(rig.svc.is_dispensing());
}

#[test]
fn sensor_plugged_in_later_clears_offline_fault() {
    let mut hw = MockBoard::new();
    hw.distance_mm = None;
    let mut rig = Rig::with_board(SystemConfig::default(), hw);
    rig.start();

    rig.hw.distance_mm = Some(50);
    rig.run_for(1_500);

    assert!(rig.sink.any(|e| *e == AppEvent::FaultCleared(SafetyFault::SensorOffline)));
    assert!(!rig.svc.has_fault(SafetyFault::SensorOffline));
    assert!(rig.svc.status_report().sensor_online);
}

#[test]
fn repeated_read_failures_take_sensor_offline() {
    let mut rig = Rig::started();
    rig.hw.distance_mm = None;

    rig.run_for(3_500);
    assert!(!rig.svc.has_fault(SafetyFault::SensorOffline));

    rig.run_for(3_000);
    assert!(rig.svc.has_fault(SafetyFault::SensorOffline));
    assert!(rig.sink.count(|e| matches!(e, AppEvent::SensorFailed(_))) >= 5);
}

// ── Manual feed ──────────────────────────────────────────────

#[test]
fn feed_button_dispenses_minimum_portion() {
    let mut rig = Rig::started();

    rig.press_feed();
    assert!(rig.svc.is_dispensing());
    assert_eq!(rig.svc.state(), SystemState::ManualFeeding);
    assert!(rig.hw.played(&buzzer::MANUAL_FEED));

    assert!(rig.run_until(10_000, |r| !r.svc.is_dispensing()));
    assert_eq!(rig.hw.pulses, 500);
    assert!(!rig.hw.motor_enabled);
    assert!(rig.hw.played(&buzzer::FEED_DONE));
    assert!(rig.sink.any(|e| *e
        == AppEvent::FeedCompleted {
            kind: FeedKind::Manual,
            steps: 500
        }));

    rig.tick();
    assert_eq!(rig.svc.state(), SystemState::Idle);
    // Manual feeds are not counted against the auto-feed quota.
    assert_eq!(rig.svc.daily_feeds(), 0);
    assert_eq!(rig.link.bodies_containing("Manual feed CAT 29g"), 1);
}

#[test]
fn manual_feed_rejected_while_dispensing() {
    let mut rig = Rig::started();

    assert_eq!(rig.svc.handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink), Ok(()));
    let second = rig.svc.handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink);

    assert_eq!(second, Err(Error::Motor(MotorError::Busy)));
    assert!(rig.hw.played(&buzzer::REJECTED));
    assert!(rig.sink.any(|e| *e
        == AppEvent::FeedRejected {
            kind: FeedKind::Manual,
            reason: MotorError::Busy
        }));
}

#[test]
fn button_press_while_dispensing_is_refused_without_stopping_the_feed() {
    let mut rig = Rig::started();
    rig.press_feed();
    rig.run_for(200);

    rig.press_feed();
    assert!(rig.svc.is_dispensing());
    assert!(rig.hw.played(&buzzer::REJECTED));
    assert_eq!(
        rig.sink.count(|e| *e
            == AppEvent::FeedRejected {
                kind: FeedKind::Manual,
                reason: MotorError::Busy
            }),
        1
    );

    assert!(rig.run_until(10_000, |r| !r.svc.is_dispensing()));
    assert_eq!(rig.hw.pulses, 500);
}

#[test]
fn bouncing_button_yields_one_feed() {
    let mut rig = Rig::started();

    for level in [false, true, false, true, false, true] {
        rig.hw.feed_level = level;
        rig.tick();
        rig.hw.advance_ms(2);
    }

    let starts = rig.sink.count(|e| matches!(e, AppEvent::FeedStarted { .. }));
    assert_eq!(starts, 1);
}

// ── Mode ─────────────────────────────────────────────────────

#[test]
fn mode_button_toggles_and_changes_portion() {
    let mut rig = Rig::started();

    rig.press_mode();
    assert_eq!(rig.svc.mode(), FeedingMode::Dog);
    assert!(rig.hw.played(&buzzer::MODE_DOG));
    assert!(rig.sink.any(|e| *e == AppEvent::ModeChanged(FeedingMode::Dog)));

    rig.svc
        .handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink)
        .unwrap();
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::FeedStarted {
            kind: FeedKind::Manual,
            steps: 1700,
            ..
        }
    )));

    rig.press_mode();
    assert_eq!(rig.svc.mode(), FeedingMode::Cat);
    assert!(rig.hw.played(&buzzer::MODE_CAT));
}

#[test]
fn set_mode_to_current_mode_is_silent() {
    let mut rig = Rig::started();
    rig.sink.clear();

    rig.svc
        .handle_command(AppCommand::SetMode(FeedingMode::Cat), &mut rig.hw, &mut rig.sink)
        .unwrap();
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::ModeChanged(_))));
}

// ── Auto-feed ────────────────────────────────────────────────

#[test]
fn empty_bowl_is_fed_after_confirmation_window() {
    let mut rig = Rig::started();
    rig.hw.set_distance_cm(18.0);

    rig.run_for(50_000);
    assert!(rig.sink.any(|e| matches!(e, AppEvent::BowlEmpty { .. })));
    assert!(rig.hw.played(&buzzer::BOWL_EMPTY));
    assert_eq!(rig.svc.state(), SystemState::CheckingBowl);
    assert_eq!(auto_feeds(&rig), 0, "no feed inside the confirmation window");

    assert!(rig.run_until(30_000, |r| auto_feeds(r) == 1));
    assert_eq!(rig.svc.state(), SystemState::Dispensing);
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::FeedStarted {
            kind: FeedKind::Auto,
            steps: 1100,
            ..
        }
    )));

    let confirmed = rig.sink.position(|e| *e == AppEvent::EmptyConfirmed);
    let started = rig.sink.position(|e| matches!(e, AppEvent::FeedStarted { .. }));
    assert!(confirmed < started);
    assert!(rig.hw.played(&buzzer::EMPTY_CONFIRMED));
    assert!(rig.hw.played(&buzzer::AUTO_FEED));
    assert_eq!(rig.svc.daily_feeds(), 1);

    assert!(rig.run_until(15_000, |r| !r.svc.is_dispensing()));
    assert_eq!(rig.hw.pulses, 1100);
    assert_eq!(rig.link.bodies_containing("Auto-fed CAT 64g"), 1);
}

#[test]
fn refilled_bowl_cancels_confirmation() {
    let mut rig = Rig::started();
    rig.hw.set_distance_cm(18.0);
    rig.run_for(30_000);
    assert_eq!(rig.svc.policy_state(), StateId::ConfirmingEmpty);

    rig.hw.set_distance_cm(5.0);
    rig.run_for(60_000);

    assert!(rig.sink.any(|e| matches!(e, AppEvent::BowlFilled { .. })));
    assert!(rig.hw.played(&buzzer::BOWL_FILLED));
    assert_eq!(rig.svc.policy_state(), StateId::Idle);
    assert_eq!(auto_feeds(&rig), 0);
}

#[test]
fn dead_band_reading_keeps_bowl_empty() {
    let mut rig = Rig::started();
    rig.hw.set_distance_cm(18.0);
    rig.run_for(2_000);
    assert!(rig.svc.sensors().bowl_empty());

    rig.hw.set_distance_cm(11.0);
    rig.run_for(2_000);
    assert!(rig.svc.sensors().bowl_empty());
}

#[test]
fn daily_quota_caps_auto_feeds_and_alerts_once() {
    let mut config = SystemConfig::default();
    config.max_daily_auto_feeds = 1;
    let mut rig = Rig::new(config);
    rig.start();
    rig.hw.set_distance_cm(18.0);

    rig.run_for(300_000);

    assert_eq!(auto_feeds(&rig), 1);
    assert_eq!(rig.svc.daily_feeds(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::QuotaExhausted { .. })),
        1
    );
    assert_eq!(rig.svc.policy_state(), StateId::Suppressed);
    assert_eq!(rig.link.bodies_containing("daily limit reached (1/1"), 1);
}

#[test]
fn feeds_respect_minimum_interval() {
    let mut config = SystemConfig::default();
    config.bowl_empty_confirmation_ms = 10_000;
    let mut rig = Rig::new(config);
    rig.start();
    rig.hw.set_distance_cm(18.0);

    // First feed after ~15 s, the second no sooner than 120 s after it.
    assert!(rig.run_until(30_000, |r| auto_feeds(r) == 1));
    let first = rig.hw.now();
    assert!(rig.run_until(200_000, |r| auto_feeds(r) == 2));
    // Checks run on a 5 s grid, so allow for where the tick landed.
    assert!(rig.hw.now().wrapping_sub(first) >= 119_000);
}

#[test]
fn disabled_auto_feed_suppresses_until_reenabled() {
    let mut rig = Rig::started();
    rig.svc
        .handle_command(AppCommand::SetAutoFeed(false), &mut rig.hw, &mut rig.sink)
        .unwrap();
    assert!(rig.sink.any(|e| *e == AppEvent::AutoFeedToggled(false)));

    rig.hw.set_distance_cm(18.0);
    rig.run_for(120_000);
    assert_eq!(auto_feeds(&rig), 0);
    assert_eq!(rig.svc.policy_state(), StateId::Suppressed);

    rig.svc
        .handle_command(AppCommand::SetAutoFeed(true), &mut rig.hw, &mut rig.sink)
        .unwrap();
    assert!(rig.run_until(6_000, |r| auto_feeds(r) == 1));
}

#[test]
fn daily_window_rollover_resets_counter_and_notifies() {
    let mut config = SystemConfig::default();
    config.daily_window_ms = 30_000;
    let mut rig = Rig::new(config);
    rig.start();

    rig.run_for(36_000);

    assert!(rig.sink.any(|e| *e == AppEvent::DailyReset));
    assert_eq!(rig.link.bodies_containing("New day started"), 1);
}

#[test]
fn auto_feed_works_across_clock_wrap() {
    let mut hw = MockBoard::new();
    hw.set_now_ms(u32::MAX - 20_000);
    let mut rig = Rig::with_board(SystemConfig::default(), hw);
    rig.start();
    rig.hw.set_distance_cm(18.0);

    assert!(rig.run_until(100_000, |r| auto_feeds(r) == 1));
    assert!(rig.hw.now() < 100_000, "clock should have wrapped");
}

// ── Hopper ───────────────────────────────────────────────────

#[test]
fn low_hopper_alerts_and_refill_clears() {
    let mut rig = Rig::started();
    rig.hw.set_distance_cm(30.0);
    rig.run_for(1_500);

    assert!(rig.sink.any(|e| matches!(e, AppEvent::HopperLow { .. })));
    assert!(rig.hw.played(&buzzer::HOPPER_LOW));
    assert!(rig.sink.any(|e| *e
        == AppEvent::SmsQueued {
            priority: Priority::Medium,
            admission: petfeeder::gsm::queue::Admission::Queued
        }));
    assert_eq!(rig.link.bodies_containing("hopper is running low"), 1);
    assert!(rig.svc.status_report().hopper_low);

    rig.hw.set_distance_cm(5.0);
    rig.run_for(1_500);
    assert!(rig.sink.any(|e| matches!(e, AppEvent::HopperRefilled { .. })));
    assert!(rig.hw.played(&buzzer::HOPPER_REFILLED));
    assert!(!rig.svc.status_report().hopper_low);
}

// ── Faults ───────────────────────────────────────────────────

#[test]
fn emergency_stop_command_aborts_and_latches() {
    let mut rig = Rig::started();
    rig.press_feed();
    rig.run_for(500);
    assert!(rig.svc.is_dispensing());

    rig.svc
        .handle_command(AppCommand::EmergencyStop, &mut rig.hw, &mut rig.sink)
        .unwrap();

    assert!(!rig.svc.is_dispensing());
    assert!(!rig.hw.motor_enabled);
    assert!(rig.hw.pulses < 500);
    assert!(rig.hw.played(&buzzer::EMERGENCY_STOP));
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::FeedAborted {
            kind: FeedKind::Manual,
            ..
        }
    )));
    assert!(rig.sink.any(|e| *e == AppEvent::FaultRaised(SafetyFault::EmergencyStop)));
    assert_eq!(rig.svc.state(), SystemState::ErrorState);

    // Pulses stay stopped across later ticks.
    let pulses = rig.hw.pulses;
    rig.run_for(2_000);
    assert_eq!(rig.hw.pulses, pulses);

    let blocked = rig.svc.handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink);
    assert_eq!(blocked, Err(Error::Motor(MotorError::Faulted)));

    rig.svc
        .handle_command(AppCommand::ClearFaults, &mut rig.hw, &mut rig.sink)
        .unwrap();
    assert!(rig.sink.any(|e| *e == AppEvent::FaultCleared(SafetyFault::EmergencyStop)));
    assert_eq!(rig.svc.state(), SystemState::Idle);
    assert_eq!(rig.svc.handle_command(AppCommand::ManualFeed, &mut rig.hw, &mut rig.sink), Ok(()));
}

#[test]
fn emergency_stop_blocks_auto_feed() {
    let mut rig = Rig::started();
    rig.svc
        .handle_command(AppCommand::EmergencyStop, &mut rig.hw, &mut rig.sink)
        .unwrap();
    rig.hw.set_distance_cm(18.0);

    rig.run_for(150_000);
    assert_eq!(auto_feeds(&rig), 0);
}

#[test]
fn overlong_dispense_times_out() {
    let mut config = SystemConfig::default();
    config.feeding_timeout_ms = 1_000;
    let mut rig = Rig::new(config);
    rig.start();

    rig.press_feed();
    rig.run_for(2_000);

    assert!(!rig.svc.is_dispensing());
    assert!(!rig.hw.motor_enabled);
    assert!(rig.sink.any(|e| *e == AppEvent::FaultRaised(SafetyFault::FeedTimeout)));
    assert!(rig.sink.any(|e| matches!(e, AppEvent::FeedAborted { .. })));
    assert_eq!(rig.svc.state(), SystemState::ErrorState);

    // The error SMS shares the High class with the manual-feed SMS, so it
    // waits out the 10 s spacing.
    assert_eq!(rig.link.bodies_containing("Feeding timeout"), 0);
    rig.run_for(10_000);
    assert_eq!(rig.link.bodies_containing("Feeding timeout"), 1);
}

// ── Status and SMS ───────────────────────────────────────────

#[test]
fn periodic_status_only_while_idle() {
    let mut rig = Rig::started();
    rig.run_for(10_500);

    let report = rig.sink.events.iter().find_map(|e| match e {
        AppEvent::Status(r) => Some(*r),
        _ => None,
    });
    let report = report.expect("status report after 10 s");
    assert_eq!(report.state, SystemState::Idle);
    assert_eq!(report.mode, FeedingMode::Cat);
    assert_eq!(report.fed_today, 0);
    assert_eq!(report.modem, ModemStatus::SmsReady);

    rig.sink.clear();
    rig.hw.set_distance_cm(18.0);
    rig.run_for(20_000);
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::Status(_))));
}

#[test]
fn send_status_queues_low_priority_sms() {
    let mut rig = Rig::started();
    rig.svc
        .handle_command(AppCommand::SendStatus, &mut rig.hw, &mut rig.sink)
        .unwrap();
    rig.tick();

    assert!(rig.sink.any(|e| *e == AppEvent::SmsSent(Priority::Low)));
    assert_eq!(rig.link.bodies_containing("Status: Mode CAT, auto ON, fed 0/8"), 1);
}

#[test]
fn send_sms_normalises_local_number() {
    let mut rig = Rig::started();
    let cmd = AppCommand::SendSms {
        recipient: Recipient::try_from("09171234567").unwrap(),
        body: SmsBody::try_from("hello").unwrap(),
        priority: Priority::Low,
    };
    rig.svc.handle_command(cmd, &mut rig.hw, &mut rig.sink).unwrap();
    rig.tick();

    assert_eq!(rig.link.sent, vec![("+639171234567".to_string(), "hello".to_string())]);
}

#[test]
fn alerts_wait_for_modem() {
    let mut rig = Rig::started();
    rig.link = MockLink::offline();

    rig.press_feed();
    assert!(rig.run_until(10_000, |r| !r.svc.is_dispensing()));
    rig.run_for(1_000);
    assert_eq!(rig.svc.sms_pending(), 1);
    assert!(rig.link.sent.is_empty());

    rig.link.status = ModemStatus::SmsReady;
    rig.tick();
    assert_eq!(rig.svc.sms_pending(), 0);
    assert_eq!(rig.link.sent.len(), 1);
    assert!(rig.sink.any(|e| *e
        == AppEvent::ModemStatusChanged {
            from: ModemStatus::Offline,
            to: ModemStatus::SmsReady
        }));
}

#[test]
fn failed_send_is_reported_and_dropped() {
    let mut rig = Rig::started();
    rig.link.fail_sends = true;

    rig.press_feed();
    assert!(rig.run_until(10_000, |r| !r.svc.is_dispensing()));
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::SmsFailed {
            priority: Priority::High,
            ..
        }
    )));
    assert_eq!(rig.svc.sms_pending(), 0);
    assert_eq!(rig.svc.sms_dispatcher().counters(), (0, 1));
}

#[test]
fn modem_polled_on_its_interval() {
    let mut rig = Rig::started();
    rig.run_for(25_000);
    assert_eq!(rig.link.polls, 2);
}

#[test]
fn modem_and_sms_wait_for_the_motor() {
    let mut rig = Rig::started();
    rig.run_for(9_000);
    assert_eq!(rig.link.polls, 0);

    rig.press_feed();
    rig.run_for(1_500);
    assert!(rig.svc.is_dispensing());
    assert_eq!(rig.link.polls, 0, "poll deferred while dispensing");
    assert!(rig.link.sent.is_empty());
    assert_eq!(rig.svc.sms_pending(), 1);

    assert!(rig.run_until(10_000, |r| !r.svc.is_dispensing()));
    rig.tick();
    assert_eq!(rig.link.polls, 1);
    assert_eq!(rig.link.bodies_containing("Manual feed"), 1);
}

fn dog_rig_with_empty_bowl(link: impl FnOnce(&MockBoard) -> MockLink) -> Rig {
    let mut config = SystemConfig::default();
    config.initial_mode = FeedingMode::Dog;
    let mut rig = Rig::new(config);
    rig.link = link(&rig.hw);
    rig.start();
    // empty bowl, hopper still above its low mark
    rig.hw.set_distance_cm(20.0);
    rig
}

fn assert_full_dog_feed(rig: &Rig) {
    assert_eq!(rig.hw.pulses, 4_250);
    assert!(rig.sink.any(|e| *e
        == AppEvent::FeedCompleted {
            kind: FeedKind::Auto,
            steps: 4_250
        }));
    assert!(!rig.sink.any(|e| *e == AppEvent::FaultRaised(SafetyFault::FeedTimeout)));
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::FeedAborted { .. })));
    assert!(!rig.svc.has_fault(SafetyFault::FeedTimeout));
}

#[test]
fn slow_network_search_does_not_time_out_a_dog_feed() {
    // Each registration query holds the loop for its full 5 s timeout.
    let mut rig = dog_rig_with_empty_bowl(|hw| {
        let mut link = MockLink::ready().blocking(hw.clock(), 5_000, 0);
        link.status = ModemStatus::NetworkSearching;
        link
    });

    assert!(rig.run_until(120_000, |r| auto_feeds(r) == 1));
    let polls = rig.link.polls;
    let started = rig.hw.now();

    assert!(rig.run_until(60_000, |r| !r.svc.is_dispensing()));
    assert!(rig.hw.now().wrapping_sub(started) > 20_000);
    assert_full_dog_feed(&rig);

    // The poll that fell due mid-feed runs right after it, once.
    rig.tick();
    assert_eq!(rig.link.polls, polls + 1);
    assert_eq!(rig.svc.sms_pending(), 1, "auto-feed alert waits for the network");
}

#[test]
fn auto_feed_alert_is_sent_after_the_dispense_it_reports() {
    // A send that runs into the 15 s send timeout.
    let mut rig = dog_rig_with_empty_bowl(|hw| MockLink::ready().blocking(hw.clock(), 0, 15_000));

    assert!(rig.run_until(120_000, |r| auto_feeds(r) == 1));
    assert!(rig.sink.any(|e| *e
        == AppEvent::SmsQueued {
            priority: Priority::High,
            admission: petfeeder::gsm::queue::Admission::Queued
        }));
    assert!(rig.link.sent.is_empty());

    assert!(rig.run_until(60_000, |r| !r.svc.is_dispensing()));
    rig.tick();
    assert_full_dog_feed(&rig);

    let completed = rig.sink.position(|e| matches!(e, AppEvent::FeedCompleted { .. }));
    let sent = rig.sink.position(|e| *e == AppEvent::SmsSent(Priority::High));
    assert!(sent.is_some());
    assert!(completed < sent);
    assert_eq!(rig.link.bodies_containing("Auto-fed DOG 250g"), 1);
}
