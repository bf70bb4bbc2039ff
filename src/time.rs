//! Wraparound-safe millisecond arithmetic.
//!
//! The firmware clock is a free-running `u32` millisecond counter that
//! wraps after ~49.7 days.  Every duration in the system is computed as
//! `now.wrapping_sub(snapshot)`, which yields the correct elapsed time
//! across a wrap as long as the real interval is shorter than one full
//! period.  Timestamps are never compared with `<` / `>` directly.

/// Milliseconds elapsed from `since` to `now`, correct across wraparound.
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// `true` once at least `interval_ms` has passed since `since`.
#[inline]
pub const fn has_elapsed(now: u32, since: u32, interval_ms: u32) -> bool {
    elapsed_ms(now, since) >= interval_ms
}

/// Like [`has_elapsed`], but an unset timestamp counts as "long ago".
///
/// Used for gates that must pass on first use (no previous feed, no
/// previous send for a priority class, etc.).
#[inline]
pub fn has_elapsed_since(now: u32, since: Option<u32>, interval_ms: u32) -> bool {
    since.is_none_or(|t| has_elapsed(now, t, interval_ms))
}
