//! Three-bar candlestick pattern detectors
//!
//! Morning/Evening Star (large candle, gapped small candle, large reversal
//! candle closing past the first body's midpoint) and Three White Soldiers /
//! Three Black Crows (staircases of large same-color candles). All measure
//! their trend confirmation over the bars preceding the three-bar formation.

use std::collections::HashMap;

use super::helpers;
use super::{PatternDetector, PatternKind, PatternResult};
use crate::params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector};
use crate::window::{Bar, BarWindow};
use crate::{Direction, Period, Ratio, Result};

impl_with_defaults!(
    MorningStarDetector,
    EveningStarDetector,
    ThreeWhiteSoldiersDetector,
    ThreeBlackCrowsDetector,
);

/// The three most recent bars as (first, middle, last), oldest first.
/// `None` if history is short or any of the three has zero range.
fn formation(window: &BarWindow) -> Option<(&Bar, &Bar, &Bar)> {
    let last = window.get(0)?;
    let middle = window.get(1)?;
    let first = window.get(2)?;
    if first.range() <= 0.0 || middle.range() <= 0.0 || last.range() <= 0.0 {
        return None;
    }
    Some((first, middle, last))
}

// ============================================================
// MORNING STAR / EVENING STAR
// ============================================================

/// Morning Star: large bearish candle, small candle whose body gaps below
/// it, then a large bullish candle closing above the first body's midpoint.
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
    pub body_size_min: Ratio,
    pub middle_body_max: Ratio,
    pub trend_bars: Period,
}

impl Default for MorningStarDetector {
    fn default() -> Self {
        Self {
            body_size_min: Ratio::new_const(helpers::LARGE_BODY_MIN),
            middle_body_max: Ratio::new_const(helpers::SMALL_BODY_MAX),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::MorningStar
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 3
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let (first, middle, last) = formation(window)?;

        if !first.is_bearish() || !last.is_bullish() {
            return None;
        }
        if first.body_ratio()? < self.body_size_min.get()
            || last.body_ratio()? < self.body_size_min.get()
            || middle.body_ratio()? > self.middle_body_max.get()
        {
            return None;
        }
        // The middle body must gap entirely below the first body.
        if middle.body_top() >= first.body_bottom() {
            return None;
        }
        // Third candle closes at least halfway back up the first body.
        if last.close < (first.open + first.close) / 2.0 {
            return None;
        }
        if !helpers::downtrend(window, 2, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::MorningStar,
            direction: Direction::Bullish,
            anchor: middle.low,
        })
    }
}

/// Evening Star: the Morning Star mirrored; bearish reversal after an
/// uptrend.
#[derive(Debug, Clone, Copy)]
pub struct EveningStarDetector {
    pub body_size_min: Ratio,
    pub middle_body_max: Ratio,
    pub trend_bars: Period,
}

impl Default for EveningStarDetector {
    fn default() -> Self {
        Self {
            body_size_min: Ratio::new_const(helpers::LARGE_BODY_MIN),
            middle_body_max: Ratio::new_const(helpers::SMALL_BODY_MAX),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for EveningStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::EveningStar
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 3
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let (first, middle, last) = formation(window)?;

        if !first.is_bullish() || !last.is_bearish() {
            return None;
        }
        if first.body_ratio()? < self.body_size_min.get()
            || last.body_ratio()? < self.body_size_min.get()
            || middle.body_ratio()? > self.middle_body_max.get()
        {
            return None;
        }
        // The middle body must gap entirely above the first body.
        if middle.body_bottom() <= first.body_top() {
            return None;
        }
        // Third candle closes at least halfway back down the first body.
        if last.close > (first.open + first.close) / 2.0 {
            return None;
        }
        if !helpers::uptrend(window, 2, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::EveningStar,
            direction: Direction::Bearish,
            anchor: middle.high,
        })
    }
}

// ============================================================
// THREE WHITE SOLDIERS / THREE BLACK CROWS
// ============================================================

/// Three White Soldiers: three large bullish candles, each opening inside
/// the previous body and closing above the previous close.
#[derive(Debug, Clone, Copy)]
pub struct ThreeWhiteSoldiersDetector {
    pub body_size_min: Ratio,
    pub trend_bars: Period,
}

impl Default for ThreeWhiteSoldiersDetector {
    fn default() -> Self {
        Self {
            body_size_min: Ratio::new_const(helpers::LARGE_BODY_MIN),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeWhiteSoldiers
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 3
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let (first, middle, last) = formation(window)?;

        if !first.is_bullish() || !middle.is_bullish() || !last.is_bullish() {
            return None;
        }
        let min_body = self.body_size_min.get();
        if first.body_ratio()? < min_body
            || middle.body_ratio()? < min_body
            || last.body_ratio()? < min_body
        {
            return None;
        }
        // Each candle opens inside the prior body and closes beyond its close.
        if !(middle.open > first.open && middle.open < first.close) {
            return None;
        }
        if !(last.open > middle.open && last.open < middle.close) {
            return None;
        }
        if middle.close <= first.close || last.close <= middle.close {
            return None;
        }
        if !helpers::downtrend(window, 2, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::ThreeWhiteSoldiers,
            direction: Direction::Bullish,
            anchor: last.high,
        })
    }
}

/// Three Black Crows: the bearish mirror of Three White Soldiers.
#[derive(Debug, Clone, Copy)]
pub struct ThreeBlackCrowsDetector {
    pub body_size_min: Ratio,
    pub trend_bars: Period,
}

impl Default for ThreeBlackCrowsDetector {
    fn default() -> Self {
        Self {
            body_size_min: Ratio::new_const(helpers::LARGE_BODY_MIN),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for ThreeBlackCrowsDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeBlackCrows
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 3
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let (first, middle, last) = formation(window)?;

        if !first.is_bearish() || !middle.is_bearish() || !last.is_bearish() {
            return None;
        }
        let min_body = self.body_size_min.get();
        if first.body_ratio()? < min_body
            || middle.body_ratio()? < min_body
            || last.body_ratio()? < min_body
        {
            return None;
        }
        if !(middle.open < first.open && middle.open > first.close) {
            return None;
        }
        if !(last.open < middle.open && last.open > middle.close) {
            return None;
        }
        if middle.close >= first.close || last.close >= middle.close {
            return None;
        }
        if !helpers::uptrend(window, 2, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::ThreeBlackCrows,
            direction: Direction::Bearish,
            anchor: last.low,
        })
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static STAR_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "body_size_ratio",
        param_type: ParamType::Ratio,
        default: helpers::LARGE_BODY_MIN,
        range: (0.3, 0.7, 0.1),
        description: "Minimum body/range ratio for the outer candles",
    },
    ParamMeta {
        name: "middle_body_ratio",
        param_type: ParamType::Ratio,
        default: helpers::SMALL_BODY_MAX,
        range: (0.1, 0.5, 0.1),
        description: "Maximum body/range ratio for the middle candle",
    },
    ParamMeta {
        name: "trend_bars",
        param_type: ParamType::Period,
        default: helpers::TREND_BARS as f64,
        range: (3.0, 10.0, 1.0),
        description: "Trend confirmation lookback",
    },
];

static SOLDIERS_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "body_size_ratio",
        param_type: ParamType::Ratio,
        default: helpers::LARGE_BODY_MIN,
        range: (0.3, 0.7, 0.1),
        description: "Minimum body/range ratio for each candle",
    },
    ParamMeta {
        name: "trend_bars",
        param_type: ParamType::Period,
        default: helpers::TREND_BARS as f64,
        range: (3.0, 10.0, 1.0),
        description: "Trend confirmation lookback",
    },
];

impl ParameterizedDetector for MorningStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        STAR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_size_min: get_ratio(params, "body_size_ratio", helpers::LARGE_BODY_MIN)?,
            middle_body_max: get_ratio(params, "middle_body_ratio", helpers::SMALL_BODY_MAX)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "morning_star"
    }
}

impl ParameterizedDetector for EveningStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        STAR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_size_min: get_ratio(params, "body_size_ratio", helpers::LARGE_BODY_MIN)?,
            middle_body_max: get_ratio(params, "middle_body_ratio", helpers::SMALL_BODY_MAX)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "evening_star"
    }
}

impl ParameterizedDetector for ThreeWhiteSoldiersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SOLDIERS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_size_min: get_ratio(params, "body_size_ratio", helpers::LARGE_BODY_MIN)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "three_white_soldiers"
    }
}

impl ParameterizedDetector for ThreeBlackCrowsDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SOLDIERS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_size_min: get_ratio(params, "body_size_ratio", helpers::LARGE_BODY_MIN)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "three_black_crows"
    }
}
