//! Two-bar candlestick pattern detectors
//!
//! Engulfing is the one bidirectional pattern in the set: polarity comes from
//! the current/previous bar colors, not from the pattern kind.

use std::collections::HashMap;

use super::helpers;
use super::{PatternDetector, PatternKind, PatternResult};
use crate::params::{get_period, ParamMeta, ParamType, ParameterizedDetector};
use crate::window::BarWindow;
use crate::{Direction, Period, Result};

impl_with_defaults!(EngulfingDetector);

/// Engulfing: the current body fully contains the previous body in the
/// opposite direction. Bullish engulfing requires a preceding downtrend,
/// bearish an uptrend (both measured starting at the previous bar).
#[derive(Debug, Clone, Copy)]
pub struct EngulfingDetector {
    pub trend_bars: Period,
}

impl Default for EngulfingDetector {
    fn default() -> Self {
        Self {
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for EngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Engulfing
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 2
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let curr = window.get(0)?;
        let prev = window.get(1)?;

        if curr.range() <= 0.0 {
            return None;
        }

        let trend_bars = self.trend_bars.get();

        let bullish = curr.is_bullish()
            && !prev.is_bullish()
            && curr.open <= prev.close
            && curr.close >= prev.open
            && helpers::downtrend(window, 1, trend_bars);
        if bullish {
            return Some(PatternResult {
                kind: PatternKind::Engulfing,
                direction: Direction::Bullish,
                anchor: curr.low,
            });
        }

        // Note the color asymmetry: the bullish side accepts a flat-body
        // previous bar, the bearish side requires a strictly bullish one.
        let bearish = !curr.is_bullish()
            && prev.is_bullish()
            && curr.open >= prev.close
            && curr.close <= prev.open
            && helpers::uptrend(window, 1, trend_bars);
        if bearish {
            return Some(PatternResult {
                kind: PatternKind::Engulfing,
                direction: Direction::Bearish,
                anchor: curr.high,
            });
        }

        None
    }
}

static ENGULFING_PARAMS: &[ParamMeta] = &[ParamMeta {
    name: "trend_bars",
    param_type: ParamType::Period,
    default: helpers::TREND_BARS as f64,
    range: (3.0, 10.0, 1.0),
    description: "Trend confirmation lookback",
}];

impl ParameterizedDetector for EngulfingDetector {
    fn param_meta() -> &'static [ParamMeta] {
        ENGULFING_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "engulfing"
    }
}
