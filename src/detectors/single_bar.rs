//! Single-bar candlestick pattern detectors
//!
//! Doji (indecision, no trend gate) and the Hammer / Shooting Star reversal
//! pair (small body pushed to one end of the range, long shadow on the other
//! side, trend confirmation against the reversal direction).

use std::collections::HashMap;

use super::helpers;
use super::{PatternDetector, PatternKind, PatternResult};
use crate::params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector};
use crate::window::BarWindow;
use crate::{Direction, Period, Ratio, Result};

impl_with_defaults!(DojiDetector, HammerDetector, ShootingStarDetector);

// ============================================================
// DOJI
// ============================================================

/// Doji: open and close virtually equal relative to the bar's range.
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub body_ratio_max: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            body_ratio_max: Ratio::new_const(helpers::DOJI_BODY_MAX),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Doji
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let bar = window.latest()?;
        // body_ratio is None on a zero-range bar: defined non-detection.
        let body_ratio = bar.body_ratio()?;

        if body_ratio > self.body_ratio_max.get() {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::Doji,
            direction: Direction::Neutral,
            anchor: bar.high,
        })
    }
}

// ============================================================
// HAMMER / SHOOTING STAR
// ============================================================

/// Hammer: small body in the top of the range, long lower shadow, after a
/// downtrend.
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub body_ratio_max: Ratio,
    pub shadow_ratio_min: Ratio,
    pub opposite_shadow_max: Ratio,
    pub body_pos_max: Ratio,
    pub trend_bars: Period,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            body_ratio_max: Ratio::new_const(helpers::REVERSAL_BODY_MAX),
            shadow_ratio_min: Ratio::new_const(helpers::REVERSAL_SHADOW_MIN),
            opposite_shadow_max: Ratio::new_const(helpers::REVERSAL_OPPOSITE_SHADOW_MAX),
            body_pos_max: Ratio::new_const(helpers::REVERSAL_BODY_POS_MAX),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for HammerDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Hammer
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 1
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let bar = window.latest()?;
        let body_ratio = bar.body_ratio()?;
        let upper = bar.upper_shadow_ratio()?;
        let lower = bar.lower_shadow_ratio()?;
        // Distance from the high down to the top of the body, as a fraction
        // of the range: small means the body sits near the top.
        let body_pos = (bar.high - bar.body_top()) / bar.range();

        if body_ratio > self.body_ratio_max.get() {
            return None;
        }
        if lower < self.shadow_ratio_min.get() {
            return None;
        }
        if upper > self.opposite_shadow_max.get() {
            return None;
        }
        if body_pos > self.body_pos_max.get() {
            return None;
        }
        if !helpers::downtrend(window, 0, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::Hammer,
            direction: Direction::Bullish,
            anchor: bar.low,
        })
    }
}

/// Shooting Star: the Hammer mirrored — small body at the bottom, long upper
/// shadow, after an uptrend.
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub body_ratio_max: Ratio,
    pub shadow_ratio_min: Ratio,
    pub opposite_shadow_max: Ratio,
    pub body_pos_max: Ratio,
    pub trend_bars: Period,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            body_ratio_max: Ratio::new_const(helpers::REVERSAL_BODY_MAX),
            shadow_ratio_min: Ratio::new_const(helpers::REVERSAL_SHADOW_MIN),
            opposite_shadow_max: Ratio::new_const(helpers::REVERSAL_OPPOSITE_SHADOW_MAX),
            body_pos_max: Ratio::new_const(helpers::REVERSAL_BODY_POS_MAX),
            trend_bars: Period::new_const(helpers::TREND_BARS),
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ShootingStar
    }

    fn min_bars(&self) -> usize {
        self.trend_bars.get() + 1
    }

    fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
        let bar = window.latest()?;
        let body_ratio = bar.body_ratio()?;
        let upper = bar.upper_shadow_ratio()?;
        let lower = bar.lower_shadow_ratio()?;
        // Distance from the low up to the bottom of the body.
        let body_pos = (bar.body_bottom() - bar.low) / bar.range();

        if body_ratio > self.body_ratio_max.get() {
            return None;
        }
        if upper < self.shadow_ratio_min.get() {
            return None;
        }
        if lower > self.opposite_shadow_max.get() {
            return None;
        }
        if body_pos > self.body_pos_max.get() {
            return None;
        }
        if !helpers::uptrend(window, 0, self.trend_bars.get()) {
            return None;
        }

        Some(PatternResult {
            kind: PatternKind::ShootingStar,
            direction: Direction::Bearish,
            anchor: bar.high,
        })
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static DOJI_PARAMS: &[ParamMeta] = &[ParamMeta {
    name: "body_ratio",
    param_type: ParamType::Ratio,
    default: helpers::DOJI_BODY_MAX,
    range: (0.01, 0.15, 0.01),
    description: "Maximum body/range ratio",
}];

static HAMMER_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "body_ratio",
        param_type: ParamType::Ratio,
        default: helpers::REVERSAL_BODY_MAX,
        range: (0.1, 0.5, 0.1),
        description: "Maximum body/range ratio",
    },
    ParamMeta {
        name: "shadow_ratio",
        param_type: ParamType::Ratio,
        default: helpers::REVERSAL_SHADOW_MIN,
        range: (0.4, 0.8, 0.1),
        description: "Minimum dominant shadow/range ratio",
    },
    ParamMeta {
        name: "opposite_shadow_ratio",
        param_type: ParamType::Ratio,
        default: helpers::REVERSAL_OPPOSITE_SHADOW_MAX,
        range: (0.05, 0.2, 0.05),
        description: "Maximum opposite shadow/range ratio",
    },
    ParamMeta {
        name: "body_pos_ratio",
        param_type: ParamType::Ratio,
        default: helpers::REVERSAL_BODY_POS_MAX,
        range: (0.1, 0.5, 0.1),
        description: "Maximum body offset from the dominant end",
    },
    ParamMeta {
        name: "trend_bars",
        param_type: ParamType::Period,
        default: helpers::TREND_BARS as f64,
        range: (3.0, 10.0, 1.0),
        description: "Trend confirmation lookback",
    },
];

impl ParameterizedDetector for DojiDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOJI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_ratio_max: get_ratio(params, "body_ratio", helpers::DOJI_BODY_MAX)?,
        })
    }

    fn pattern_name() -> &'static str {
        "doji"
    }
}

impl ParameterizedDetector for HammerDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_ratio_max: get_ratio(params, "body_ratio", helpers::REVERSAL_BODY_MAX)?,
            shadow_ratio_min: get_ratio(params, "shadow_ratio", helpers::REVERSAL_SHADOW_MIN)?,
            opposite_shadow_max: get_ratio(
                params,
                "opposite_shadow_ratio",
                helpers::REVERSAL_OPPOSITE_SHADOW_MAX,
            )?,
            body_pos_max: get_ratio(params, "body_pos_ratio", helpers::REVERSAL_BODY_POS_MAX)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "hammer"
    }
}

impl ParameterizedDetector for ShootingStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        // Same knobs as the Hammer, mirrored geometry.
        HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            body_ratio_max: get_ratio(params, "body_ratio", helpers::REVERSAL_BODY_MAX)?,
            shadow_ratio_min: get_ratio(params, "shadow_ratio", helpers::REVERSAL_SHADOW_MIN)?,
            opposite_shadow_max: get_ratio(
                params,
                "opposite_shadow_ratio",
                helpers::REVERSAL_OPPOSITE_SHADOW_MAX,
            )?,
            body_pos_max: get_ratio(params, "body_pos_ratio", helpers::REVERSAL_BODY_POS_MAX)?,
            trend_bars: get_period(params, "trend_bars", helpers::TREND_BARS)?,
        })
    }

    fn pattern_name() -> &'static str {
        "shooting_star"
    }
}
