//! Fuzz target: `ResponseScanner`
//!
//! Pushes arbitrary modem output in arbitrary chunk sizes and checks that
//! the scanner never panics, never grows past its capacity, and still
//! sees a token appended after the noise.
//!
//! cargo fuzz run fuzz_at_scanner

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::gsm::at::{RESPONSE_CAPACITY, ResponseScanner, ScanResult};

const EXPECTED: [&str; 2] = ["+CREG: 0,1", "OK"];

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(split).max(1);

    let mut scanner = ResponseScanner::new();
    for part in rest.chunks(chunk) {
        scanner.push(part);
        assert!(scanner.as_bytes().len() <= RESPONSE_CAPACITY);
        let _ = scanner.scan(&EXPECTED);
    }

    // A complete final-result line after any prefix must be found.
    scanner.push(b"\r\nOK\r\n");
    assert!(matches!(scanner.scan(&EXPECTED), ScanResult::Matched(_)));

    scanner.clear();
    assert_eq!(scanner.scan(&EXPECTED), ScanResult::Pending);
});
