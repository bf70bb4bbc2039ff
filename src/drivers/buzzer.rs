//! Piezo buzzer: tone patterns and a bit-banged square-wave driver.
//!
//! Every audible cue the feeder makes is one of the `const` patterns
//! below; the service only ever names a pattern.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{BuzzerPort, Tone};
use crate::config::FeedingMode;

const fn tone(freq_hz: u32, duration_ms: u32, gap_ms: u32) -> Tone {
    Tone {
        freq_hz,
        duration_ms,
        gap_ms,
    }
}

/// Ascending chirp after boot.
pub const STARTUP: [Tone; 3] = [tone(1000, 100, 50), tone(1500, 100, 50), tone(2000, 150, 0)];

/// Two high beeps: cat mode selected.
pub const MODE_CAT: [Tone; 2] = [tone(2500, 100, 50), tone(2500, 100, 0)];
/// Three medium beeps: dog mode selected.
pub const MODE_DOG: [Tone; 3] = [tone(1500, 150, 50), tone(1500, 150, 50), tone(1500, 150, 0)];

/// Rising two-tone before a manual dispense.
pub const MANUAL_FEED: [Tone; 2] = [tone(1800, 100, 50), tone(2200, 100, 0)];
/// Short double beep before an automatic dispense.
pub const AUTO_FEED: [Tone; 2] = [tone(2000, 80, 30), tone(2000, 80, 0)];
/// Dispense finished.
pub const FEED_DONE: [Tone; 1] = [tone(2500, 150, 0)];
/// Manual feed refused (motor busy or faulted).
pub const REJECTED: [Tone; 1] = [tone(400, 300, 0)];

/// Bowl crossed into "empty".
pub const BOWL_EMPTY: [Tone; 2] = [tone(1000, 100, 50), tone(1000, 100, 0)];
/// Bowl crossed back to "full".
pub const BOWL_FILLED: [Tone; 1] = [tone(2000, 100, 0)];
/// Bowl stayed empty for the whole confirmation window.
pub const EMPTY_CONFIRMED: [Tone; 1] = [tone(1200, 150, 0)];

/// Urgent triple beep: hopper running low.
pub const HOPPER_LOW: [Tone; 3] = [tone(800, 200, 100), tone(800, 200, 100), tone(800, 200, 0)];
/// Hopper refilled.
pub const HOPPER_REFILLED: [Tone; 2] = [tone(1500, 80, 30), tone(2000, 80, 0)];

/// Emergency stop / feed timeout warning.
pub const EMERGENCY_STOP: [Tone; 3] = [tone(1000, 200, 100), tone(1000, 200, 100), tone(1000, 200, 0)];

/// Mode-change cue for `mode`.
pub fn mode_pattern(mode: FeedingMode) -> &'static [Tone] {
    match mode {
        FeedingMode::Cat => &MODE_CAT,
        FeedingMode::Dog => &MODE_DOG,
    }
}

/// Square-wave generator on a plain GPIO.
pub struct Buzzer<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> Buzzer<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        let mut buzzer = Self { pin, delay };
        buzzer.drive(false);
        buzzer
    }

    /// Set the pin level.  A failed write is logged and reported as `false`.
    fn drive(&mut self, high: bool) -> bool {
        let result = if high { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Buzzer pin write failed: {:?}", e);
                false
            }
        }
    }

    fn square_wave(&mut self, freq_hz: u32, duration_ms: u32) {
        if freq_hz == 0 {
            self.delay.delay_ms(duration_ms);
            return;
        }
        let half_period_us = 500_000 / freq_hz;
        let cycles = (u64::from(duration_ms) * u64::from(freq_hz) / 1000) as u32;
        for _ in 0..cycles {
            // a dead pin ends the tone rather than logging every cycle
            if !self.drive(true) {
                return;
            }
            self.delay.delay_us(half_period_us);
            if !self.drive(false) {
                return;
            }
            self.delay.delay_us(half_period_us);
        }
    }
}

impl<P: OutputPin, D: DelayNs> BuzzerPort for Buzzer<P, D> {
    fn play(&mut self, pattern: &[Tone]) {
        for t in pattern {
            self.square_wave(t.freq_hz, t.duration_ms);
            if t.gap_ms > 0 {
                self.delay.delay_ms(t.gap_ms);
            }
        }
    }
}
