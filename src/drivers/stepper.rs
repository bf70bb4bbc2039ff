//! DRV8825 stepper driver over `embedded-hal` pins.
//!
//! ## Hardware
//!
//! | Signal | Level                         | Timing                      |
//! |--------|-------------------------------|-----------------------------|
//! | EN     | LOW = energised (active low)  | 2 ms settle after enabling  |
//! | DIR    | HIGH = dispense direction     | 5 µs setup before a pulse   |
//! | STEP   | rising edge = one microstep   | 5 µs high, rest of period low |
//!
//! Pin write errors are logged and otherwise ignored; a GPIO that cannot
//! be driven is not something the control loop can recover from.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::MotorPort;

/// STEP high time.
pub const PULSE_WIDTH_US: u32 = 5;
/// DIR must be stable this long before the first STEP edge.
pub const DIR_SETUP_US: u32 = 5;
/// Time for the driver outputs to energise after EN goes low.
pub const ENABLE_SETTLE_MS: u32 = 2;

/// STEP/DIR/EN pins plus the delay source used for pulse timing.
pub struct StepperDriver<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    en: EN,
    delay: D,
    enabled: bool,
}

impl<STEP, DIR, EN, D> StepperDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// Takes the pins and drives them to the safe state (disabled,
    /// STEP low).
    pub fn new(step: STEP, dir: DIR, en: EN, delay: D) -> Self {
        let mut driver = Self {
            step,
            dir,
            en,
            delay,
            enabled: false,
        };
        report(driver.step.set_low(), "STEP");
        report(driver.dir.set_low(), "DIR");
        report(driver.en.set_high(), "EN");
        driver
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<STEP, DIR, EN, D> MotorPort for StepperDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn enable(&mut self) {
        report(self.en.set_low(), "EN");
        self.enabled = true;
        self.delay.delay_ms(ENABLE_SETTLE_MS);
    }

    fn disable(&mut self) {
        report(self.en.set_high(), "EN");
        self.enabled = false;
    }

    fn set_direction(&mut self, forward: bool) {
        report(self.dir.set_state(forward.into()), "DIR");
        self.delay.delay_us(DIR_SETUP_US);
    }

    fn pulse(&mut self, period_us: u32) {
        report(self.step.set_high(), "STEP");
        self.delay.delay_us(PULSE_WIDTH_US);
        report(self.step.set_low(), "STEP");
        self.delay.delay_us(period_us.saturating_sub(PULSE_WIDTH_US));
    }
}

fn report<E: core::fmt::Debug>(result: Result<(), E>, pin: &'static str) {
    if let Err(e) = result {
        warn!("Stepper {} pin write failed: {:?}", pin, e);
    }
}
