//! OHLCV bars and the bounded lookback window.
//!
//! `BarWindow` is the only view the detectors and the aggregator have onto
//! price history. Offsets are relative: `ago = 0` is the most recent bar,
//! `ago = k` is k bars earlier. The window never exposes future bars.

use std::collections::VecDeque;

use crate::{Period, Result, StrategyError};

/// One OHLCV observation for a fixed time interval.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    /// Epoch timestamp (unit is the caller's choice; only ordering matters).
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[inline]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    #[inline]
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Top of the real body (max of open/close).
    #[inline]
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Bottom of the real body (min of open/close).
    #[inline]
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Body as ratio of range. Returns None if range == 0 (degenerate bar).
    #[inline]
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.body() / range)
    }

    #[inline]
    pub fn upper_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.upper_shadow() / range)
    }

    #[inline]
    pub fn lower_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.lower_shadow() / range)
    }

    /// Validate OHLCV consistency (finite fields, high >= low).
    pub fn validate(&self) -> Result<()> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| v.is_nan()) {
            return Err(StrategyError::InvalidBar {
                reason: "NaN in OHLCV",
            });
        }
        if fields.iter().any(|v| v.is_infinite()) {
            return Err(StrategyError::InvalidBar {
                reason: "infinite value in OHLCV",
            });
        }
        if self.high < self.low {
            return Err(StrategyError::InvalidBar {
                reason: "high < low",
            });
        }
        Ok(())
    }
}

/// Append-only, causally ordered view over OHLCV history.
///
/// Retention is either unbounded (strategy lifetime) or a fixed-capacity
/// ring that evicts the oldest bar on overflow. `ago` offsets count back
/// from the most recent bar; the type makes negative (look-ahead) offsets
/// unrepresentable.
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: Option<usize>,
}

impl BarWindow {
    /// Window that retains every appended bar.
    pub fn unbounded() -> Self {
        Self {
            bars: VecDeque::new(),
            capacity: None,
        }
    }

    /// Fixed-capacity ring; the oldest bar is evicted once full.
    pub fn bounded(capacity: Period) -> Self {
        let capacity = capacity.get();
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Append a bar. O(1).
    ///
    /// Timestamps must be non-decreasing; a bar older than the last
    /// appended one is rejected (caller contract violation).
    pub fn push(&mut self, bar: Bar) -> Result<()> {
        if let Some(last) = self.bars.back() {
            if bar.timestamp < last.timestamp {
                return Err(StrategyError::NonMonotonicTimestamp {
                    last: last.timestamp,
                    got: bar.timestamp,
                });
            }
        }
        if let Some(capacity) = self.capacity {
            if self.bars.len() == capacity {
                self.bars.pop_front();
            }
        }
        self.bars.push_back(bar);
        Ok(())
    }

    /// Checked relative access; `ago = 0` is the most recent bar.
    ///
    /// Failing here means a component asked for history it has no right to
    /// assume exists — a bug in the caller, not bad market data. Components
    /// probing for optional history (warm-up) use [`BarWindow::get`].
    pub fn at(&self, ago: usize) -> Result<&Bar> {
        self.get(ago).ok_or(StrategyError::LookbackOutOfRange {
            ago,
            len: self.bars.len(),
        })
    }

    /// Relative access that treats missing history as `None` (warm-up).
    #[inline]
    pub fn get(&self, ago: usize) -> Option<&Bar> {
        let len = self.bars.len();
        if ago >= len {
            return None;
        }
        self.bars.get(len - 1 - ago)
    }

    /// The most recent bar, if any.
    #[inline]
    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Count of retained bars (not total appended, for a bounded window).
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn relative_access() {
        let mut w = BarWindow::unbounded();
        w.push(bar(1, 10.0)).unwrap();
        w.push(bar(2, 20.0)).unwrap();
        w.push(bar(3, 30.0)).unwrap();

        assert_eq!(w.at(0).unwrap().close, 30.0);
        assert_eq!(w.at(1).unwrap().close, 20.0);
        assert_eq!(w.at(2).unwrap().close, 10.0);
        assert!(w.at(3).is_err());
        assert!(w.get(3).is_none());
    }

    #[test]
    fn rejects_backwards_timestamp() {
        let mut w = BarWindow::unbounded();
        w.push(bar(10, 100.0)).unwrap();
        let err = w.push(bar(9, 100.0)).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::NonMonotonicTimestamp { last: 10, got: 9 }
        ));
        // Equal timestamps are fine.
        w.push(bar(10, 101.0)).unwrap();
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn bounded_ring_evicts_oldest() {
        let mut w = BarWindow::bounded(Period::new(3).unwrap());
        for i in 0..5 {
            w.push(bar(i, i as f64)).unwrap();
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.at(0).unwrap().close, 4.0);
        assert_eq!(w.at(2).unwrap().close, 2.0);
        assert!(w.at(3).is_err());
    }

    #[test]
    fn bar_geometry() {
        let b = Bar::new(0, 100.0, 110.0, 90.0, 105.0, 1.0);
        assert_eq!(b.body(), 5.0);
        assert_eq!(b.range(), 20.0);
        assert_eq!(b.upper_shadow(), 5.0);
        assert_eq!(b.lower_shadow(), 10.0);
        assert!(b.is_bullish());
        assert!((b.body_ratio().unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_range_has_no_ratios() {
        let b = Bar::new(0, 100.0, 100.0, 100.0, 100.0, 1.0);
        assert!(b.body_ratio().is_none());
        assert!(b.upper_shadow_ratio().is_none());
        assert!(b.lower_shadow_ratio().is_none());
    }

    #[test]
    fn validate_rejects_nan() {
        let mut b = Bar::new(0, 100.0, 110.0, 90.0, 105.0, 1.0);
        b.high = f64::NAN;
        assert!(b.validate().is_err());
    }
}
