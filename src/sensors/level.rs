//! Two-threshold hysteresis classifier for fill levels.
//!
//! The sensor looks down into the bowl/hopper, so a *larger* distance
//! means *less* food.  The classifier flips to "empty" only above the
//! upper threshold and back to "full" only below the lower one; readings
//! in the dead band keep the previous classification.

/// Edge reported by [`LevelClassifier::update`], at most once per change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTransition {
    /// Crossed above the empty threshold.
    BecameEmpty,
    /// Crossed below the full threshold.
    BecameFull,
}

/// Hysteresis classifier for one level (bowl or hopper).
#[derive(Debug, Clone)]
pub struct LevelClassifier {
    empty_above_cm: f32,
    full_below_cm: f32,
    is_empty: bool,
    last_transition_ms: Option<u32>,
}

impl LevelClassifier {
    /// Starts in the "not empty" state.
    pub fn new(empty_above_cm: f32, full_below_cm: f32) -> Self {
        debug_assert!(full_below_cm < empty_above_cm);
        Self {
            empty_above_cm,
            full_below_cm,
            is_empty: false,
            last_transition_ms: None,
        }
    }

    /// Classify one valid distance.  Returns the transition if the state
    /// changed on this sample.
    pub fn update(&mut self, distance_cm: f32, now_ms: u32) -> Option<LevelTransition> {
        let transition = if !self.is_empty && distance_cm > self.empty_above_cm {
            self.is_empty = true;
            LevelTransition::BecameEmpty
        } else if self.is_empty && distance_cm < self.full_below_cm {
            self.is_empty = false;
            LevelTransition::BecameFull
        } else {
            return None;
        };
        self.last_transition_ms = Some(now_ms);
        Some(transition)
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn last_transition_ms(&self) -> Option<u32> {
        self.last_transition_ms
    }
}
