//! Peripheral drivers: buttons, stepper, buzzer and the task watchdog.

pub mod button;
pub mod buzzer;
pub mod stepper;
pub mod watchdog;
