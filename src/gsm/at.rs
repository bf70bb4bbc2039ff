//! AT command exchange.
//!
//! Wire format: the command text followed by CRLF; the reply is scanned
//! byte by byte for any of the expected literal substrings.  `ERROR`
//! anywhere in the reply fails the exchange, and no match before the
//! deadline is a timeout.  Every exchange is bounded by its timeout.

use heapless::Vec;
use log::{debug, trace};

use crate::app::ports::{ModemTransport, TimePort};
use crate::error::ModemError;
use crate::time::has_elapsed;

/// Bytes of reply kept for matching.  Modem echo plus the longest reply
/// the firmware waits for fit comfortably.
pub const RESPONSE_CAPACITY: usize = 256;

const ERROR_TOKEN: &[u8] = b"ERROR";

/// Ctrl-Z, terminates an SMS body.
pub const CTRL_Z: u8 = 0x1A;
/// ESC, abandons an SMS prompt.
pub const ESC: u8 = 0x1B;

/// Outcome of scanning the bytes received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// Nothing conclusive yet.
    Pending,
    /// `expected[i]` was found.
    Matched(usize),
    /// The modem answered `ERROR`.
    Error,
}

/// Accumulates reply bytes and looks for the expected tokens.
///
/// When the buffer fills, the oldest bytes are discarded so a token at
/// the end of a long unsolicited burst is still seen.
#[derive(Debug, Default)]
pub struct ResponseScanner {
    buf: Vec<u8, RESPONSE_CAPACITY>,
}

impl ResponseScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.buf.is_full() {
                // keep the newest half
                let keep = RESPONSE_CAPACITY / 2;
                let start = self.buf.len() - keep;
                self.buf.copy_within(start.., 0);
                self.buf.truncate(keep);
            }
            // cannot fail: room was made above
            let _ = self.buf.push(b);
        }
    }

    /// Expected tokens take precedence over `ERROR`.
    pub fn scan(&self, expected: &[&str]) -> ScanResult {
        if let Some(i) = expected
            .iter()
            .position(|token| contains(&self.buf, token.as_bytes()))
        {
            return ScanResult::Matched(i);
        }
        if contains(&self.buf, ERROR_TOKEN) {
            return ScanResult::Error;
        }
        ScanResult::Pending
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Send `command` + CRLF and wait for one of `expected`.
///
/// Stale input is flushed first.  Returns the index of the token that
/// matched.
pub fn send_command<T: ModemTransport, C: TimePort>(
    transport: &mut T,
    clock: &C,
    command: &str,
    expected: &[&str],
    timeout_ms: u32,
) -> Result<usize, ModemError> {
    transport.clear_input();
    debug!("AT >> {}", command);
    transport.write(command.as_bytes())?;
    transport.write(b"\r\n")?;
    await_response(transport, clock, expected, timeout_ms)
}

/// Wait for one of `expected` without sending anything first.
pub fn await_response<T: ModemTransport, C: TimePort>(
    transport: &mut T,
    clock: &C,
    expected: &[&str],
    timeout_ms: u32,
) -> Result<usize, ModemError> {
    let started = clock.now_ms();
    let mut scanner = ResponseScanner::new();
    let mut chunk = [0u8; 32];

    loop {
        let n = transport.read(&mut chunk);
        if n > 0 {
            scanner.push(&chunk[..n]);
            match scanner.scan(expected) {
                ScanResult::Matched(i) => {
                    trace!("AT << {:?}", core::str::from_utf8(scanner.as_bytes()));
                    return Ok(i);
                }
                ScanResult::Error => {
                    debug!("AT << ERROR");
                    return Err(ModemError::ErrorResponse);
                }
                ScanResult::Pending => {}
            }
        }
        if has_elapsed(clock.now_ms(), started, timeout_ms) {
            debug!("AT timeout waiting for {:?}", expected);
            return Err(ModemError::Timeout);
        }
    }
}
