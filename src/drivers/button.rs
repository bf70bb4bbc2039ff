//! Polled, debounced press detection for the two front-panel buttons.
//!
//! ## Hardware
//!
//! Active-low momentary switches on internal pull-ups.  The main loop
//! samples the raw level every tick and feeds it to an [`EdgeDetector`];
//! a press is the HIGH→LOW edge.
//!
//! ## Debounce rule
//!
//! A falling edge is accepted only if at least `debounce_ms` has passed
//! since the previously *accepted* edge.  The stored level follows the
//! input on every call, accepted or not, so contact bounce (H→L→H→L...)
//! inside the window yields exactly one press.

use crate::time::has_elapsed_since;

/// Default debounce window.
pub const DEBOUNCE_MS: u32 = 50;

/// Falling-edge detector with a minimum spacing between accepted edges.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    debounce_ms: u32,
    last_level: bool,
    last_accepted_ms: Option<u32>,
}

impl EdgeDetector {
    /// Detector for a pulled-up input (idle level HIGH).
    pub fn new(debounce_ms: u32) -> Self {
        Self::with_initial_level(debounce_ms, true)
    }

    /// Detector seeded with the level read at boot, so a button held
    /// during reset does not register a press.
    pub fn with_initial_level(debounce_ms: u32, level: bool) -> Self {
        Self {
            debounce_ms,
            last_level: level,
            last_accepted_ms: None,
        }
    }

    /// Feed one raw sample.  Returns `true` exactly when a debounced
    /// press is recognised.
    pub fn poll(&mut self, level: bool, now_ms: u32) -> bool {
        let falling = self.last_level && !level;
        self.last_level = level;

        if falling && has_elapsed_since(now_ms, self.last_accepted_ms, self.debounce_ms) {
            self.last_accepted_ms = Some(now_ms);
            return true;
        }
        false
    }

    /// Level seen on the previous call.
    pub fn last_level(&self) -> bool {
        self.last_level
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}
