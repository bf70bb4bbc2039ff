//! Sensor subsystem: the distance reader and the aggregating [`SensorHub`].
//!
//! A single downward-looking ultrasonic sensor serves both the bowl and
//! the hopper classifiers.  The hub owns the reader, both hysteresis
//! classifiers and the last known-good sample; invalid reads never touch
//! the classifiers.

pub mod distance;
pub mod level;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::DistanceBus;
use crate::config::SystemConfig;
use crate::error::SensorError;
use distance::{BOOT_PROBE_ATTEMPTS, DistanceReader};
use level::{LevelClassifier, LevelTransition};

/// One distance measurement.  `valid == false` samples carry the
/// timestamp of the failed attempt and no usable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub value_cm: f32,
    pub valid: bool,
    pub timestamp_ms: u32,
}

impl DistanceSample {
    fn invalid(now_ms: u32) -> Self {
        Self {
            value_cm: 0.0,
            valid: false,
            timestamp_ms: now_ms,
        }
    }
}

/// Outcome of one sensor poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReport {
    pub sample: DistanceSample,
    pub error: Option<SensorError>,
    pub bowl: Option<LevelTransition>,
    pub hopper: Option<LevelTransition>,
    /// `Some(true)` when the sensor just went offline, `Some(false)` when
    /// it just came back.
    pub offline_changed: Option<bool>,
}

/// Owns the distance reader and both level classifiers.
pub struct SensorHub {
    reader: DistanceReader,
    bowl: LevelClassifier,
    hopper: LevelClassifier,
    last_good: Option<DistanceSample>,
    consecutive_failures: u8,
    offline_after: u8,
    offline: bool,
}

impl SensorHub {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            reader: DistanceReader::new(config.sensor_i2c_address, config.sensor_settle_ms),
            bowl: LevelClassifier::new(config.bowl_empty_above_cm, config.bowl_full_below_cm),
            hopper: LevelClassifier::new(config.hopper_low_above_cm, config.hopper_ok_below_cm),
            last_good: None,
            consecutive_failures: 0,
            offline_after: config.sensor_offline_after_failures.max(1),
            offline: false,
        }
    }

    /// Boot-time probe followed by an initial reading.
    pub fn begin(&mut self, bus: &mut (impl DistanceBus + DelayNs), now_ms: u32) -> SensorReport {
        if self.reader.probe(bus, BOOT_PROBE_ATTEMPTS) {
            self.poll(bus, now_ms)
        } else {
            warn!("Distance sensor absent: auto-feed suspended until it answers");
            self.offline = true;
            SensorReport {
                sample: DistanceSample::invalid(now_ms),
                error: Some(SensorError::NotInitialized),
                bowl: None,
                hopper: None,
                offline_changed: Some(true),
            }
        }
    }

    /// Read once and classify.  An absent sensor is re-probed (single
    /// attempt) before the read.
    pub fn poll(&mut self, bus: &mut (impl DistanceBus + DelayNs), now_ms: u32) -> SensorReport {
        if !self.reader.is_initialized() {
            self.reader.probe(bus, 1);
        }

        match self.reader.read_cm(bus) {
            Ok(cm) => {
                let sample = DistanceSample {
                    value_cm: cm,
                    valid: true,
                    timestamp_ms: now_ms,
                };
                self.last_good = Some(sample);
                self.consecutive_failures = 0;
                let offline_changed = if self.offline {
                    self.offline = false;
                    info!("Distance sensor back online");
                    Some(false)
                } else {
                    None
                };
                SensorReport {
                    sample,
                    error: None,
                    bowl: self.bowl.update(cm, now_ms),
                    hopper: self.hopper.update(cm, now_ms),
                    offline_changed,
                }
            }
            Err(e) => {
                warn!("Distance read failed: {}", e);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let offline_changed =
                    if !self.offline && self.consecutive_failures >= self.offline_after {
                        self.offline = true;
                        Some(true)
                    } else {
                        None
                    };
                SensorReport {
                    sample: DistanceSample::invalid(now_ms),
                    error: Some(e),
                    bowl: None,
                    hopper: None,
                    offline_changed,
                }
            }
        }
    }

    pub fn bowl_empty(&self) -> bool {
        self.bowl.is_empty()
    }

    pub fn hopper_low(&self) -> bool {
        self.hopper.is_empty()
    }

    pub fn is_online(&self) -> bool {
        !self.offline
    }

    /// Most recent valid sample.
    pub fn last_good(&self) -> Option<DistanceSample> {
        self.last_good
    }
}
