//! GPIO / peripheral pin assignments for the PetFeeder main board
//! (ESP32-S3-DevKitC-1).
//!
//! Single source of truth for the wiring; `main` routes the matching
//! `esp-idf-hal` pins into the drivers.

// ---------------------------------------------------------------------------
// Stepper motor driver (DRV8825)
// ---------------------------------------------------------------------------

/// STEP input: one rising edge per microstep.
pub const STEP_GPIO: i32 = 2;
/// DIR input: HIGH = dispense direction.
pub const DIR_GPIO: i32 = 1;
/// EN input: driver energised while LOW.
pub const ENABLE_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// RCWL-9620 ultrasonic distance sensor (I2C)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// The sensor is specified for standard-mode I2C; 50 kHz keeps the long
/// cable run to the bowl reliable.
pub const I2C_BAUDRATE_HZ: u32 = 50_000;

// ---------------------------------------------------------------------------
// Buttons (active LOW, internal pull-up)
// ---------------------------------------------------------------------------

pub const FEED_BUTTON_GPIO: i32 = 10;
pub const MODE_BUTTON_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Piezo buzzer
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// SIM800L GSM modem (UART1)
// ---------------------------------------------------------------------------

/// ESP32 RX <- modem TX.
pub const GSM_RX_GPIO: i32 = 6;
/// ESP32 TX -> modem RX.
pub const GSM_TX_GPIO: i32 = 7;
/// Modem RST line, pulsed LOW to hard-reset.
pub const GSM_RESET_GPIO: i32 = 13;
pub const GSM_BAUD: u32 = 9600;
