//! System configuration parameters
//!
//! All tunable parameters for the PetFeeder system.  Defaults match the
//! calibrated hardware build; a JSON override can be baked in at build
//! time through `PETFEEDER_CONFIG_JSON` (see [`SystemConfig::from_json`]).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::control::profile::{MotionProfile, MotionRequest};

/// Maximum length of an E.164 phone number including the leading `+`.
pub const RECIPIENT_CAPACITY: usize = 20;

/// Which animal the portion band is sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedingMode {
    Cat,
    Dog,
}

impl FeedingMode {
    /// The other mode (mode button behaviour).
    pub fn toggled(self) -> Self {
        match self {
            Self::Cat => Self::Dog,
            Self::Dog => Self::Cat,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cat => "CAT",
            Self::Dog => "DOG",
        }
    }
}

/// Inclusive portion band, in motor steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortionBand {
    pub min_steps: u32,
    pub max_steps: u32,
}

impl PortionBand {
    /// Portion used for a button press.
    pub fn manual(&self) -> u32 {
        self.min_steps
    }

    /// Portion used by the auto-feed policy (band midpoint).
    pub fn auto(&self) -> u32 {
        self.min_steps + (self.max_steps - self.min_steps) / 2
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Bowl / hopper thresholds (cm from sensor) ---
    /// Bowl is classified empty above this distance.
    pub bowl_empty_above_cm: f32,
    /// Bowl is classified full again below this distance.
    pub bowl_full_below_cm: f32,
    /// Hopper is classified low above this distance.
    pub hopper_low_above_cm: f32,
    /// Hopper is classified refilled below this distance.
    pub hopper_ok_below_cm: f32,

    // --- Portions ---
    pub cat_portion: PortionBand,
    pub dog_portion: PortionBand,
    /// Calibration factor for grams <-> steps reporting.
    pub steps_per_gram: f32,
    /// Mode selected at boot.
    pub initial_mode: FeedingMode,

    // --- Motor ---
    /// Cruise step rate (steps/s).
    pub motor_max_speed_hz: u32,
    /// Upper bound on accel/decel ramp length (steps).
    pub motor_acceleration: u32,
    /// Pulses emitted per scheduler tick while dispensing.
    pub motor_steps_per_slice: u32,
    /// A dispense running longer than this is aborted.
    pub feeding_timeout_ms: u32,

    // --- Sensor ---
    pub sensor_i2c_address: u8,
    /// Wait between trigger and frame read.
    pub sensor_settle_ms: u32,
    pub sensor_read_interval_ms: u32,
    /// Consecutive failed reads before the sensor is flagged offline.
    pub sensor_offline_after_failures: u8,

    // --- Inputs ---
    pub debounce_ms: u32,

    // --- Auto-feed ---
    pub auto_feed_enabled: bool,
    pub auto_feed_check_interval_ms: u32,
    pub auto_feed_min_interval_ms: u32,
    pub bowl_empty_confirmation_ms: u32,
    pub max_daily_auto_feeds: u32,
    pub daily_window_ms: u32,
    /// Minimum spacing of "quota exhausted" notices.
    pub quota_alert_interval_ms: u32,

    // --- Modem ---
    pub modem_poll_interval_ms: u32,
    /// Overall deadline for Initializing (searching gets twice this).
    pub modem_init_timeout_ms: u32,
    /// Per-command timeout for plain AT probes.
    pub modem_at_timeout_ms: u32,
    /// Per-command timeout for network registration queries.
    pub modem_network_timeout_ms: u32,
    pub modem_liveness_interval_ms: u32,
    pub modem_recovery_interval_ms: u32,
    pub sms_send_timeout_ms: u32,

    // --- SMS rate limits (per priority class) ---
    pub sms_high_interval_ms: u32,
    pub sms_medium_interval_ms: u32,
    pub sms_low_interval_ms: u32,
    pub alert_recipient: String<RECIPIENT_CAPACITY>,

    // --- Reporting ---
    pub status_report_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut alert_recipient = String::new();
        // 13 chars always fits the 20-char buffer.
        let _ = alert_recipient.push_str("+639291145133");

        Self {
            // Thresholds
            bowl_empty_above_cm: 15.0,
            bowl_full_below_cm: 8.0,
            hopper_low_above_cm: 25.0,
            hopper_ok_below_cm: 20.0,

            // Portions: 17 steps/g => cat 30-100 g, dog 100-400 g
            cat_portion: PortionBand {
                min_steps: 500,
                max_steps: 1700,
            },
            dog_portion: PortionBand {
                min_steps: 1700,
                max_steps: 6800,
            },
            steps_per_gram: 17.0,
            initial_mode: FeedingMode::Cat,

            // Motor
            motor_max_speed_hz: 200,
            motor_acceleration: 100,
            motor_steps_per_slice: 20,
            feeding_timeout_ms: 30_000,

            // Sensor
            sensor_i2c_address: 0x57,
            sensor_settle_ms: 80,
            sensor_read_interval_ms: 1000,
            sensor_offline_after_failures: 5,

            // Inputs
            debounce_ms: 50,

            // Auto-feed
            auto_feed_enabled: true,
            auto_feed_check_interval_ms: 5000,
            auto_feed_min_interval_ms: 120_000, // 2 min
            bowl_empty_confirmation_ms: 60_000, // 1 min
            max_daily_auto_feeds: 8,
            daily_window_ms: 86_400_000, // 24 h
            quota_alert_interval_ms: 3_600_000, // 1 h

            // Modem
            modem_poll_interval_ms: 10_000,
            modem_init_timeout_ms: 30_000,
            modem_at_timeout_ms: 2000,
            modem_network_timeout_ms: 5000,
            modem_liveness_interval_ms: 60_000,
            modem_recovery_interval_ms: 30_000,
            sms_send_timeout_ms: 15_000,

            // SMS
            sms_high_interval_ms: 10_000,
            sms_medium_interval_ms: 30_000,
            sms_low_interval_ms: 120_000,
            alert_recipient,

            // Reporting
            status_report_interval_ms: 10_000,
        }
    }
}

impl SystemConfig {
    /// Portion band for the given mode.
    pub fn portion(&self, mode: FeedingMode) -> PortionBand {
        match mode {
            FeedingMode::Cat => self.cat_portion,
            FeedingMode::Dog => self.dog_portion,
        }
    }

    /// Dispense move for `steps` at the configured speed and ramp.
    pub fn motion_request(&self, steps: u32) -> MotionRequest {
        MotionRequest {
            total_steps: steps,
            max_speed_hz: self.motor_max_speed_hz,
            acceleration: self.motor_acceleration,
        }
    }

    /// Largest portion either mode ever dispenses (manual or automatic).
    pub fn longest_portion(&self) -> u32 {
        [self.cat_portion, self.dog_portion]
            .iter()
            .flat_map(|band| [band.manual(), band.auto()])
            .max()
            .unwrap_or(0)
    }

    /// Portion weight for a number of motor steps.
    pub fn steps_to_grams(&self, steps: u32) -> f32 {
        steps as f32 / self.steps_per_gram
    }

    /// Reject values that would make the control loop misbehave.
    /// Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bowl_full_below_cm >= self.bowl_empty_above_cm {
            return Err(ConfigError::ValidationFailed(
                "bowl full threshold must be below empty threshold",
            ));
        }
        if self.hopper_ok_below_cm >= self.hopper_low_above_cm {
            return Err(ConfigError::ValidationFailed(
                "hopper ok threshold must be below low threshold",
            ));
        }
        for band in [self.cat_portion, self.dog_portion] {
            if band.min_steps == 0 || band.min_steps > band.max_steps {
                return Err(ConfigError::ValidationFailed("invalid portion band"));
            }
        }
        if self.steps_per_gram <= 0.0 {
            return Err(ConfigError::ValidationFailed("steps_per_gram must be positive"));
        }
        if self.motor_max_speed_hz == 0 || self.motor_steps_per_slice == 0 {
            return Err(ConfigError::ValidationFailed("motor speed and slice must be non-zero"));
        }
        let intervals = [
            self.sensor_read_interval_ms,
            self.auto_feed_check_interval_ms,
            self.modem_poll_interval_ms,
            self.daily_window_ms,
            self.status_report_interval_ms,
            self.modem_at_timeout_ms,
            self.modem_network_timeout_ms,
            self.sms_send_timeout_ms,
        ];
        if intervals.contains(&0) {
            return Err(ConfigError::ValidationFailed("intervals and timeouts must be non-zero"));
        }
        let longest_us = MotionProfile::plan(&self.motion_request(self.longest_portion()))
            .map(|profile| profile.duration_us())
            .map_err(|_| ConfigError::ValidationFailed("portion cannot be planned"))?;
        if u64::from(self.feeding_timeout_ms) * 1000 <= longest_us {
            return Err(ConfigError::ValidationFailed(
                "feeding timeout shorter than the longest dispense",
            ));
        }
        if self.max_daily_auto_feeds == 0 {
            return Err(ConfigError::ValidationFailed("daily feed quota must be non-zero"));
        }
        if self.alert_recipient.is_empty() {
            return Err(ConfigError::ValidationFailed("alert recipient missing"));
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON override; missing keys keep their
    /// defaults.  The result is validated before it is returned.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::ParseFailed)?;
        config.validate()?;
        Ok(config)
    }
}
