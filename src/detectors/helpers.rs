//! Shared primitives for the pattern detectors.
//!
//! All detectors work on the pure body/range/shadow ratios of the bars in
//! the window; a zero-range bar never produces a detection. Trend
//! confirmation is the rolling pairwise walk the detectors gate on: a
//! downtrend holds iff every consecutive pair inside the window has the
//! earlier bar's low <= the later bar's low (the mirror on highs for an
//! uptrend). A single counter-move inside the window breaks the trend;
//! insufficient history fails the check.

use crate::window::BarWindow;

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Doji: maximum body/range ratio.
pub const DOJI_BODY_MAX: f64 = 0.05;
/// Hammer / Shooting Star: maximum body/range ratio.
pub const REVERSAL_BODY_MAX: f64 = 0.3;
/// Hammer / Shooting Star: minimum dominant shadow/range ratio.
pub const REVERSAL_SHADOW_MIN: f64 = 0.6;
/// Hammer / Shooting Star: maximum opposite shadow/range ratio.
pub const REVERSAL_OPPOSITE_SHADOW_MAX: f64 = 0.1;
/// Hammer / Shooting Star: body must sit within this fraction of the range
/// from the dominant end.
pub const REVERSAL_BODY_POS_MAX: f64 = 0.3;
/// Star / soldier patterns: minimum body/range ratio for a "large" candle.
pub const LARGE_BODY_MIN: f64 = 0.5;
/// Star patterns: maximum body/range ratio for the middle candle.
pub const SMALL_BODY_MAX: f64 = 0.3;
/// Bars of trend confirmation required before a reversal pattern counts.
pub const TREND_BARS: usize = 5;

// ============================================================
// TREND CONFIRMATION
// ============================================================

/// Downtrend confirmation over `trend_bars` pairs ending `offset` bars ago.
///
/// `offset = 0` anchors the walk at the current bar (single-bar patterns),
/// `offset = 1` at the previous bar (two-bar patterns), `offset = 2` before
/// a three-bar formation.
pub fn downtrend(window: &BarWindow, offset: usize, trend_bars: usize) -> bool {
    for k in 1..=trend_bars {
        let later = match window.get(offset + k - 1) {
            Some(bar) => bar,
            None => return false,
        };
        let earlier = match window.get(offset + k) {
            Some(bar) => bar,
            None => return false,
        };
        if earlier.low > later.low {
            return false;
        }
    }
    true
}

/// Uptrend confirmation: non-increasing highs walking forward.
pub fn uptrend(window: &BarWindow, offset: usize, trend_bars: usize) -> bool {
    for k in 1..=trend_bars {
        let later = match window.get(offset + k - 1) {
            Some(bar) => bar,
            None => return false,
        };
        let earlier = match window.get(offset + k) {
            Some(bar) => bar,
            None => return false,
        };
        if earlier.high < later.high {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Bar;
    use crate::Period;

    fn window_of(lows_highs: &[(f64, f64)]) -> BarWindow {
        let mut w = BarWindow::bounded(Period::new(64).unwrap());
        for (i, &(low, high)) in lows_highs.iter().enumerate() {
            let mid = (low + high) / 2.0;
            w.push(Bar::new(i as i64, mid, high, low, mid, 1.0)).unwrap();
        }
        w
    }

    #[test]
    fn downtrend_holds_on_nondecreasing_lows() {
        // Lows walk forward 90 -> 94: earlier <= later for every pair.
        let w = window_of(&[(90.0, 100.0), (92.0, 100.0), (93.0, 100.0), (94.0, 100.0)]);
        assert!(downtrend(&w, 0, 3));
    }

    #[test]
    fn downtrend_broken_by_single_counter_move() {
        let w = window_of(&[(90.0, 100.0), (95.0, 100.0), (93.0, 100.0), (94.0, 100.0)]);
        assert!(!downtrend(&w, 0, 3));
    }

    #[test]
    fn trend_fails_without_enough_history() {
        let w = window_of(&[(90.0, 100.0), (92.0, 100.0)]);
        assert!(!downtrend(&w, 0, 3));
        assert!(!uptrend(&w, 0, 3));
    }

    #[test]
    fn uptrend_holds_on_nonincreasing_highs() {
        let w = window_of(&[(90.0, 110.0), (90.0, 108.0), (90.0, 107.0), (90.0, 105.0)]);
        assert!(uptrend(&w, 0, 3));
    }

    #[test]
    fn offset_shifts_the_window() {
        // Pairs at offset 2 ignore the two most recent bars.
        let w = window_of(&[
            (90.0, 100.0),
            (91.0, 100.0),
            (92.0, 100.0),
            (80.0, 100.0), // counter-move, but only inside the offset-0 window
            (81.0, 100.0),
        ]);
        assert!(downtrend(&w, 2, 2));
        assert!(!downtrend(&w, 0, 2));
    }
}
