//! Candlestick pattern detectors
//!
//! Eight shape classifiers over a [`BarWindow`], grouped by how many bars the
//! formation itself spans:
//!
//! - **Single-bar**: Doji, Hammer, Shooting Star
//! - **Two-bar**: Engulfing (bullish or bearish, decided by bar colors)
//! - **Three-bar**: Morning Star, Evening Star, Three White Soldiers,
//!   Three Black Crows
//!
//! Detectors are stateless per bar: each call inspects the window and returns
//! a fresh [`PatternResult`] or nothing. Warm-up and zero-range bars are
//! defined non-detections, never errors.

use std::collections::HashMap;

use crate::window::BarWindow;
use crate::{Direction, Result};

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

// ============================================================
// PATTERN KIND
// ============================================================

/// The closed set of supported candlestick patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Doji,
    Hammer,
    ShootingStar,
    Engulfing,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl PatternKind {
    pub const ALL: [PatternKind; 8] = [
        PatternKind::Doji,
        PatternKind::Hammer,
        PatternKind::ShootingStar,
        PatternKind::Engulfing,
        PatternKind::MorningStar,
        PatternKind::EveningStar,
        PatternKind::ThreeWhiteSoldiers,
        PatternKind::ThreeBlackCrows,
    ];

    /// Stable snake_case identifier, usable as a configuration key.
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Doji => "doji",
            PatternKind::Hammer => "hammer",
            PatternKind::ShootingStar => "shooting_star",
            PatternKind::Engulfing => "engulfing",
            PatternKind::MorningStar => "morning_star",
            PatternKind::EveningStar => "evening_star",
            PatternKind::ThreeWhiteSoldiers => "three_white_soldiers",
            PatternKind::ThreeBlackCrows => "three_black_crows",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Fixed polarity of the pattern.
    ///
    /// `Some(Neutral)` (Doji) never feeds a directional streak;
    /// `None` (Engulfing) takes its direction from the bars at detection time.
    pub fn polarity(self) -> Option<Direction> {
        match self {
            PatternKind::Doji => Some(Direction::Neutral),
            PatternKind::Hammer
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers => Some(Direction::Bullish),
            PatternKind::ShootingStar
            | PatternKind::EveningStar
            | PatternKind::ThreeBlackCrows => Some(Direction::Bearish),
            PatternKind::Engulfing => None,
        }
    }
}

/// Result of a detection - Copy, produced fresh each bar.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternResult {
    pub kind: PatternKind,
    pub direction: Direction,
    /// Reference price for plotting/annotation (the formation's high or low,
    /// depending on polarity). Not load-bearing for trading decisions.
    pub anchor: f64,
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// A shape classifier over the lookback window.
pub trait PatternDetector: Send + Sync {
    fn kind(&self) -> PatternKind;

    /// Bars of history needed for a detection to be possible (formation plus
    /// trend confirmation). With less history the detector reports nothing.
    fn min_bars(&self) -> usize;

    fn detect(&self, window: &BarWindow) -> Option<PatternResult>;
}

// ============================================================
// DISPATCH ENUM
// ============================================================

/// Macro to generate the `Detector` dispatch enum without boilerplate.
macro_rules! define_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch.
        #[derive(Debug, Clone)]
        pub enum Detector {
            $($variant($detector)),*
        }

        impl Detector {
            #[inline]
            pub fn detect(&self, window: &BarWindow) -> Option<PatternResult> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, window)),*
                }
            }

            #[inline]
            pub fn kind(&self) -> PatternKind {
                match self {
                    $(Self::$variant(d) => PatternDetector::kind(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }
        }
    };
}

define_detectors! {
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Engulfing(EngulfingDetector),
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),
}

impl Detector {
    /// Detector for `kind` with default thresholds.
    pub fn with_defaults(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Doji => Detector::Doji(DojiDetector::with_defaults()),
            PatternKind::Hammer => Detector::Hammer(HammerDetector::with_defaults()),
            PatternKind::ShootingStar => {
                Detector::ShootingStar(ShootingStarDetector::with_defaults())
            }
            PatternKind::Engulfing => Detector::Engulfing(EngulfingDetector::with_defaults()),
            PatternKind::MorningStar => Detector::MorningStar(MorningStarDetector::with_defaults()),
            PatternKind::EveningStar => Detector::EveningStar(EveningStarDetector::with_defaults()),
            PatternKind::ThreeWhiteSoldiers => {
                Detector::ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector::with_defaults())
            }
            PatternKind::ThreeBlackCrows => {
                Detector::ThreeBlackCrows(ThreeBlackCrowsDetector::with_defaults())
            }
        }
    }

    /// Detector for `kind` with thresholds overridden from a name/value map;
    /// missing keys fall back to defaults, invalid values are rejected.
    pub fn from_params(kind: PatternKind, params: &HashMap<&str, f64>) -> Result<Self> {
        use crate::params::ParameterizedDetector;
        Ok(match kind {
            PatternKind::Doji => Detector::Doji(DojiDetector::with_params(params)?),
            PatternKind::Hammer => Detector::Hammer(HammerDetector::with_params(params)?),
            PatternKind::ShootingStar => {
                Detector::ShootingStar(ShootingStarDetector::with_params(params)?)
            }
            PatternKind::Engulfing => Detector::Engulfing(EngulfingDetector::with_params(params)?),
            PatternKind::MorningStar => {
                Detector::MorningStar(MorningStarDetector::with_params(params)?)
            }
            PatternKind::EveningStar => {
                Detector::EveningStar(EveningStarDetector::with_params(params)?)
            }
            PatternKind::ThreeWhiteSoldiers => {
                Detector::ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector::with_params(params)?)
            }
            PatternKind::ThreeBlackCrows => {
                Detector::ThreeBlackCrows(ThreeBlackCrowsDetector::with_params(params)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in PatternKind::ALL {
            assert_eq!(PatternKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PatternKind::from_name("hanging_man"), None);
    }

    #[test]
    fn polarity_fixed_per_kind() {
        assert_eq!(PatternKind::Doji.polarity(), Some(Direction::Neutral));
        assert_eq!(PatternKind::Hammer.polarity(), Some(Direction::Bullish));
        assert_eq!(
            PatternKind::ThreeBlackCrows.polarity(),
            Some(Direction::Bearish)
        );
        assert_eq!(PatternKind::Engulfing.polarity(), None);
    }

    #[test]
    fn with_defaults_covers_every_kind() {
        for kind in PatternKind::ALL {
            let detector = Detector::with_defaults(kind);
            assert_eq!(detector.kind(), kind);
            assert!(detector.min_bars() >= 1);
        }
    }
}
