//! Stale-prefix pruning for the auto-follow view.
//!
//! A live stream is bursty: a handful of calls, a long idle stretch, another
//! burst. Framing every span ever seen would squeeze the current burst into a
//! few pixels, so the follow view only renders the suffix after the most
//! recent idle gap that dwarfs the work done since.

use std::borrow::Borrow;

use crate::span::Span;
use crate::time::TraceDuration;

pub const DEFAULT_GAP_THRESHOLD_MULTIPLIER: i64 = 5;

/// Index of the first span worth rendering in auto-follow mode.
///
/// Scans backward accumulating the non-negative durations seen so far. The
/// first index `i > 0` whose gap to its predecessor is strictly greater than
/// `active_work × multiplier` is the boundary. Returns 0 when no such gap
/// exists.
pub fn prune_boundary<S: Borrow<Span>>(spans: &[S], multiplier: i64) -> usize {
    let mut active_work = TraceDuration::ZERO;
    for i in (1..spans.len()).rev() {
        let current = spans[i].borrow();
        let previous = spans[i - 1].borrow();
        active_work += current.duration().clamp_non_negative();
        let gap = current.start_time - previous.end_time;
        if gap > active_work.saturating_mul(multiplier) {
            return i;
        }
    }
    0
}

/// The live suffix of `spans`.
pub fn live_suffix<S: Borrow<Span>>(spans: &[S], multiplier: i64) -> &[S] {
    &spans[prune_boundary(spans, multiplier)..]
}
