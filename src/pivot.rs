//! Volume-weighted pivot detection
//!
//! A pivot is a local close extremum confirmed only after `right_bars`
//! further closes are known, so every emission refers to the bar at
//! `ago = right_bars` - the delay is a property of the definition, not lag
//! to be engineered away. Volume gating normalizes the current bar's volume
//! against a rolling high-percentile reference so "high volume" adapts to
//! the instrument's regime.

use std::collections::VecDeque;

use crate::window::BarWindow;
use crate::{Period, Ratio, Result};

/// Default pivot lookback windows and volume gate.
pub const LEFT_BARS: usize = 15;
pub const RIGHT_BARS: usize = 1;
pub const LOOKBACK: usize = 300;
pub const PERCENTILE_RANK: f64 = 95.0;
pub const FILTER_VOL: f64 = 5.6;

/// Which side of the price extremum a pivot marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// One confirmed high-volume pivot. Owned by the caller's event log.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotEvent {
    pub kind: PivotKind,
    /// Timestamp of the pivot bar (not of the confirming bar).
    pub timestamp: i64,
    /// The pivot bar's close.
    pub price: f64,
    pub normalized_volume: f64,
}

/// Configuration for [`VolumePivotDetector`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotConfig {
    /// Bars to the left of the candidate that must be strictly dominated.
    pub left_bars: Period,
    /// Bars to the right that must be dominated non-strictly; also the
    /// confirmation delay.
    pub right_bars: Period,
    /// Rolling volume history length for the percentile reference.
    pub lookback: Period,
    /// Percentile (0..=100) defining the reference volume.
    pub percentile_rank: f64,
    /// Minimum normalized volume for a pivot to be emitted.
    pub filter_vol: f64,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            left_bars: Period::new_const(LEFT_BARS),
            right_bars: Period::new_const(RIGHT_BARS),
            lookback: Period::new_const(LOOKBACK),
            percentile_rank: PERCENTILE_RANK,
            filter_vol: FILTER_VOL,
        }
    }
}

impl PivotConfig {
    pub fn validate(&self) -> Result<()> {
        // Reuse Ratio's finite-range validation for the percentile.
        Ratio::new(self.percentile_rank / 100.0)?;
        if !self.filter_vol.is_finite() || self.filter_vol < 0.0 {
            return Err(crate::StrategyError::InvalidValue(
                "filter_vol must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Bars of window history required before a candidate can be judged.
    pub fn min_bars(&self) -> usize {
        self.left_bars.get() + self.right_bars.get() + 1
    }
}

/// Linear-interpolation percentile over an unsorted sample.
///
/// Matches the standard statistical definition: sort, map `rank` onto the
/// fractional position `rank/100 * (n-1)`, interpolate between the two
/// surrounding order statistics. Empty input yields `None`.
pub fn percentile(values: &[f64], rank: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (rank / 100.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = pos - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Stateful rolling-percentile + local-extremum detector.
#[derive(Debug, Clone)]
pub struct VolumePivotDetector {
    config: PivotConfig,
    volumes: VecDeque<f64>,
}

impl VolumePivotDetector {
    pub fn new(config: PivotConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            volumes: VecDeque::with_capacity(config.lookback.get()),
            config,
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            volumes: VecDeque::with_capacity(LOOKBACK),
            config: PivotConfig::default(),
        }
    }

    pub fn config(&self) -> &PivotConfig {
        &self.config
    }

    /// Ingest the newest bar (the window's `ago = 0`) and report a pivot
    /// confirmed by it, if any.
    ///
    /// Emits nothing during warm-up: volume history shorter than `lookback`,
    /// or window history shorter than `left_bars + right_bars + 1`.
    pub fn on_bar(&mut self, window: &BarWindow) -> Option<PivotEvent> {
        let current = window.latest()?;

        if self.volumes.len() == self.config.lookback.get() {
            self.volumes.pop_front();
        }
        self.volumes.push_back(current.volume);

        if self.volumes.len() < self.config.lookback.get() {
            return None;
        }
        if window.len() < self.config.min_bars() {
            return None;
        }

        let sample: Vec<f64> = self.volumes.iter().copied().collect();
        let reference = percentile(&sample, self.config.percentile_rank)?;
        if reference == 0.0 {
            return None;
        }
        let normalized_volume = (current.volume / reference) * 5.0;
        if normalized_volume <= self.config.filter_vol {
            return None;
        }

        let right_bars = self.config.right_bars.get();
        let left_bars = self.config.left_bars.get();
        let candidate = window.get(right_bars)?;
        let price = candidate.close;

        // Strict dominance over the left window, non-strict over the right
        // (the bars between the candidate and now, current bar included).
        let mut pivot_high = true;
        let mut pivot_low = true;
        for ago in (right_bars + 1)..=(right_bars + left_bars) {
            let close = window.get(ago)?.close;
            pivot_high &= price > close;
            pivot_low &= price < close;
        }
        for ago in 0..right_bars {
            let close = window.get(ago)?.close;
            pivot_high &= price >= close;
            pivot_low &= price <= close;
        }

        let kind = if pivot_high {
            PivotKind::High
        } else if pivot_low {
            PivotKind::Low
        } else {
            return None;
        };

        Some(PivotEvent {
            kind,
            timestamp: candidate.timestamp,
            price,
            normalized_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // pos = 0.95 * 3 = 2.85 -> 3.0 + 0.85 * 1.0
        let p95 = percentile(&values, 95.0).unwrap();
        assert!((p95 - 3.85).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
        assert_eq!(percentile(&[], 95.0), None);
    }

    #[test]
    fn percentile_order_independent() {
        let a = [5.0, 1.0, 3.0, 2.0, 4.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&a, 95.0), percentile(&b, 95.0));
    }
}
