//! Fuzz target: `decode_frame`
//!
//! Feeds arbitrary 3-byte frames to the distance decoder and asserts that
//! accepted readings are in range and that the checksum flag matches the
//! frame.
//!
//! cargo fuzz run fuzz_distance_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::sensors::distance::{FRAME_LEN, MAX_RANGE_CM, decode_frame};

fuzz_target!(|data: &[u8]| {
    for chunk in data.chunks_exact(FRAME_LEN) {
        let frame = [chunk[0], chunk[1], chunk[2]];
        if let Ok(decoded) = decode_frame(frame) {
            let cm = decoded.distance_cm();
            assert!(cm > 0.0 && cm < MAX_RANGE_CM, "accepted out-of-range reading");
            assert_eq!(decoded.distance_mm, u16::from_be_bytes([frame[0], frame[1]]));
            assert_eq!(decoded.checksum_ok, frame[0].wrapping_add(frame[1]) == frame[2]);
        }
    }
});
