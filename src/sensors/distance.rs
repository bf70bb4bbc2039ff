//! RCWL-9620 ultrasonic distance sensor (I2C, address 0x57).
//!
//! ## Protocol
//!
//! 1. Write the trigger byte `0x01`.
//! 2. Wait for the measurement to complete (~80 ms, blocking).
//! 3. Read a 3-byte frame: `distance_mm` big-endian, then a checksum byte
//!    equal to `(high + low) & 0xFF`.
//!
//! Checksum mismatches are logged but the reading is accepted; the range
//! check (0 < d < 500 cm) is what rejects garbage.  A bus timeout on the
//! trigger write gets exactly one re-initialise-and-retry.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{BusError, DistanceBus};
use crate::error::SensorError;

/// Measurement trigger command.
pub const TRIGGER_COMMAND: u8 = 0x01;
/// Bytes in one measurement frame.
pub const FRAME_LEN: usize = 3;
/// Readings at or beyond this are treated as invalid.
pub const MAX_RANGE_CM: f32 = 500.0;

/// Probe attempts at boot; later re-probes use a single attempt.
pub const BOOT_PROBE_ATTEMPTS: u8 = 3;
const PROBE_RETRY_DELAY_MS: u32 = 100;
/// Settle time after re-initialising the bus on a timeout.
const REINIT_SETTLE_MS: u32 = 10;

/// A decoded measurement frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFrame {
    pub distance_mm: u16,
    pub checksum_ok: bool,
}

impl DistanceFrame {
    pub fn distance_cm(&self) -> f32 {
        self.distance_mm as f32 / 10.0
    }
}

/// Decode and range-check one 3-byte frame.
pub fn decode_frame(frame: [u8; FRAME_LEN]) -> Result<DistanceFrame, SensorError> {
    let [high, low, checksum] = frame;
    let distance_mm = u16::from_be_bytes([high, low]);
    let decoded = DistanceFrame {
        distance_mm,
        checksum_ok: high.wrapping_add(low) == checksum,
    };

    let cm = decoded.distance_cm();
    if cm <= 0.0 || cm >= MAX_RANGE_CM {
        return Err(SensorError::OutOfRange { distance_mm });
    }
    Ok(decoded)
}

/// Trigger/settle/read driver for the distance sensor.
pub struct DistanceReader {
    address: u8,
    settle_ms: u32,
    initialized: bool,
}

impl DistanceReader {
    pub fn new(address: u8, settle_ms: u32) -> Self {
        Self {
            address,
            settle_ms,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Address-only write to check the sensor answers, up to `attempts`
    /// times, 100 ms apart.
    pub fn probe(&mut self, bus: &mut (impl DistanceBus + DelayNs), attempts: u8) -> bool {
        for attempt in 1..=attempts {
            match bus.write(self.address, &[]) {
                Ok(()) => {
                    info!("Distance sensor found at 0x{:02X}", self.address);
                    self.initialized = true;
                    return true;
                }
                Err(e) => {
                    warn!("Distance sensor probe {}/{} failed: {}", attempt, attempts, e);
                    if attempt < attempts {
                        bus.delay_ms(PROBE_RETRY_DELAY_MS);
                    }
                }
            }
        }
        self.initialized = false;
        false
    }

    /// Take one measurement.  Blocks for the settle time.
    pub fn read_cm(&mut self, bus: &mut (impl DistanceBus + DelayNs)) -> Result<f32, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }

        self.trigger(bus)?;
        bus.delay_ms(self.settle_ms);

        let mut frame = [0u8; FRAME_LEN];
        let n = bus.read(self.address, &mut frame)?;
        if n < FRAME_LEN {
            return Err(SensorError::ShortRead(n));
        }

        let decoded = decode_frame(frame)?;
        if !decoded.checksum_ok {
            warn!(
                "Distance checksum mismatch (got 0x{:02X}), accepting {:.1} cm",
                frame[2],
                decoded.distance_cm()
            );
        }
        debug!("Distance: {:.1} cm", decoded.distance_cm());
        Ok(decoded.distance_cm())
    }

    fn trigger(&mut self, bus: &mut (impl DistanceBus + DelayNs)) -> Result<(), BusError> {
        match bus.write(self.address, &[TRIGGER_COMMAND]) {
            Err(BusError::Timeout) => {
                warn!("Distance sensor bus timeout, re-initialising");
                bus.reinit();
                bus.delay_ms(REINIT_SETTLE_MS);
                bus.write(self.address, &[TRIGGER_COMMAND])
            }
            other => other,
        }
    }
}
