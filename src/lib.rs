//! # candlestrat - candlestick strategy core
//!
//! Streaming candlestick-pattern trading strategy: a causally ordered bar
//! window feeds pattern detectors, whose detections are aggregated into
//! entry triggers (consecutive-bar streaks, optional indicator
//! confirmation) and executed through an order-aware trade state machine
//! with a fixed exit precedence. Completed round-trips land in an
//! append-only ledger. High-volume pivot detection runs alongside the
//! pattern pipeline on the same window.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlestrat::prelude::*;
//!
//! let mut engine = EngineBuilder::new()
//!     .pattern(PatternKind::Engulfing)
//!     .pattern(PatternKind::Hammer)
//!     .build()
//!     .unwrap();
//!
//! for i in 0..50 {
//!     let base = 100.0 + (i as f64 * 0.7).sin();
//!     let bar = Bar::new(i, base, base + 1.0, base - 1.0, base + 0.2, 1_000.0);
//!     let outcome = engine.process_bar(bar).unwrap();
//!     if let Some(record) = outcome.trade_closed {
//!         println!("closed {:?} at {}", record.direction, record.exit_price);
//!     }
//! }
//! println!("win rate: {:?}", engine.ledger().win_rate());
//! ```

pub mod detectors;
pub mod indicators;
pub mod ledger;
pub mod params;
pub mod pivot;
pub mod signal;
pub mod trade;
pub mod window;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::*,
        // Confirmation / ATR
        indicators::{Atr, Confirmation, ConfirmationChoice, ConfirmationReading},
        // Ledger
        ledger::{TradeLedger, TradeRecord},
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Pivots
        pivot::{PivotConfig, PivotEvent, PivotKind, VolumePivotDetector},
        // Signals
        signal::{SignalAggregator, SignalState, Triggers},
        // Trades
        trade::{
            ExitReason, Position, RiskParams, TradeDirection, TradeIntent, TradeState,
            TradeStateMachine,
        },
        // Window
        window::{Bar, BarWindow},
        // Engine
        run_parallel,
        BarOutcome,
        Direction,
        EngineBuilder,
        PatternSpec,
        Period,
        Ratio,
        Result,
        StrategyConfig,
        StrategyEngine,
        StrategyError,
        SweepError,
        SweepResult,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, StrategyError>;

/// Errors surfaced by the strategy pipeline
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid bar: {reason}")]
    InvalidBar { reason: &'static str },

    #[error("Non-monotonic timestamp: last {last}, got {got}")]
    NonMonotonicTimestamp { last: i64, got: i64 },

    #[error("Lookback {ago} out of range for window of {len} bars")]
    LookbackOutOfRange { ago: usize, len: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(StrategyError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(StrategyError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(StrategyError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Signal direction of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        self == Direction::Bullish
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        self == Direction::Bearish
    }
}

// ============================================================
// STRATEGY CONFIG
// ============================================================

use std::collections::HashMap;

use detectors::{Detector, PatternKind};
use indicators::ConfirmationChoice;
use ledger::{TradeLedger, TradeRecord};
use pivot::{PivotConfig, PivotEvent, VolumePivotDetector};
use signal::{SignalAggregator, Triggers};
use trade::{RiskParams, TradeIntent, TradeStateMachine};
use window::{Bar, BarWindow};

/// A pattern to run, with optional parameter overrides (empty map keeps
/// the detector's defaults).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternSpec {
    pub kind: PatternKind,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, f64>,
}

impl PatternSpec {
    pub fn with_defaults(kind: PatternKind) -> Self {
        Self {
            kind,
            params: HashMap::new(),
        }
    }

    fn build(&self) -> Result<Detector> {
        if self.params.is_empty() {
            return Ok(Detector::with_defaults(self.kind));
        }
        let params: HashMap<&str, f64> = self
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        Detector::from_params(self.kind, &params)
    }
}

/// Full strategy configuration: patterns, gating, risk and pivots.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub patterns: Vec<PatternSpec>,
    /// Detections on this many consecutive bars are required to trigger.
    pub consecutive_bars: usize,
    pub confirmation: ConfirmationChoice,
    pub risk: RiskParams,
    /// High-volume pivot detection, off by default.
    pub pivots: Option<PivotConfig>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            patterns: vec![PatternSpec::with_defaults(PatternKind::Engulfing)],
            consecutive_bars: 1,
            confirmation: ConfirmationChoice::default(),
            risk: RiskParams::default(),
            pivots: None,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() && self.pivots.is_none() {
            return Err(StrategyError::InvalidConfig(
                "no patterns and no pivot detection configured".to_string(),
            ));
        }
        if self.consecutive_bars == 0 {
            return Err(StrategyError::InvalidValue("consecutive_bars must be > 0"));
        }
        self.risk.validate()?;
        if let Some(pivots) = &self.pivots {
            pivots.validate()?;
        }
        Ok(())
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Everything one processed bar produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarOutcome {
    pub triggers: Triggers,
    pub pivot_event: Option<PivotEvent>,
    /// Trade closed on this bar, already appended to the ledger.
    pub trade_closed: Option<TradeRecord>,
}

/// Streaming strategy pipeline over a bounded bar window.
///
/// Orders implied by the state machine are filled at the same bar's close
/// (close-fill model); there is no external execution layer.
pub struct StrategyEngine {
    window: BarWindow,
    aggregator: SignalAggregator,
    pivots: Option<VolumePivotDetector>,
    machine: TradeStateMachine,
    ledger: TradeLedger,
}

impl StrategyEngine {
    pub fn new(config: &StrategyConfig) -> Result<Self> {
        config.validate()?;
        let detectors = config
            .patterns
            .iter()
            .map(|spec| spec.build())
            .collect::<Result<Vec<_>>>()?;
        let pivots = config
            .pivots
            .as_ref()
            .map(|cfg| VolumePivotDetector::new(*cfg))
            .transpose()?;
        let aggregator = SignalAggregator::new(
            detectors,
            config.consecutive_bars,
            config.confirmation.build(),
        );

        // The window only needs the deepest lookback any component takes.
        let mut capacity = aggregator.min_bars();
        if let Some(pivots) = &pivots {
            capacity = capacity.max(pivots.config().min_bars());
        }
        let window = BarWindow::bounded(Period::new(capacity)?);

        Ok(Self {
            window,
            aggregator,
            pivots,
            machine: TradeStateMachine::new(config.risk)?,
            ledger: TradeLedger::new(),
        })
    }

    /// Ingest one bar and run the whole pipeline on it.
    pub fn process_bar(&mut self, bar: Bar) -> Result<BarOutcome> {
        bar.validate()?;
        self.window.push(bar)?;

        let triggers = self.aggregator.on_bar(&self.window);
        let pivot_event = self
            .pivots
            .as_mut()
            .and_then(|pivots| pivots.on_bar(&self.window));

        let mut trade_closed = None;
        if let Some(intent) = self.machine.on_bar(&bar, triggers) {
            // Close-fill: the intent resolves against this bar's close.
            let filled = self.machine.on_order_filled(bar.close);
            if let (TradeIntent::Exit(_), Some(record)) = (intent, filled) {
                self.ledger.record(record);
                trade_closed = Some(record);
            }
        }

        Ok(BarOutcome {
            triggers,
            pivot_event,
            trade_closed,
        })
    }

    /// Process a full series in order. Stops at the first bad bar.
    pub fn run(&mut self, bars: &[Bar]) -> Result<()> {
        for bar in bars {
            self.process_bar(*bar)?;
        }
        Ok(())
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn window(&self) -> &BarWindow {
        &self.window
    }

    pub fn trade_state(&self) -> trade::TradeState {
        self.machine.state()
    }

    pub fn atr_value(&self) -> Option<f64> {
        self.machine.atr_value()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating StrategyEngine instances
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    config: StrategyConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: StrategyConfig {
                patterns: Vec::new(),
                ..StrategyConfig::default()
            },
        }
    }

    /// Add a pattern with its default parameters.
    pub fn pattern(mut self, kind: PatternKind) -> Self {
        self.config.patterns.push(PatternSpec::with_defaults(kind));
        self
    }

    /// Add a pattern with parameter overrides.
    pub fn pattern_with_params(mut self, kind: PatternKind, params: HashMap<String, f64>) -> Self {
        self.config.patterns.push(PatternSpec { kind, params });
        self
    }

    /// Add every pattern with default parameters.
    pub fn with_all_defaults(mut self) -> Self {
        for kind in PatternKind::ALL {
            self.config.patterns.push(PatternSpec::with_defaults(kind));
        }
        self
    }

    pub fn consecutive_bars(mut self, bars: usize) -> Self {
        self.config.consecutive_bars = bars;
        self
    }

    pub fn confirmation(mut self, choice: ConfirmationChoice) -> Self {
        self.config.confirmation = choice;
        self
    }

    pub fn risk(mut self, risk: RiskParams) -> Self {
        self.config.risk = risk;
        self
    }

    pub fn pivots(mut self, config: PivotConfig) -> Self {
        self.config.pivots = Some(config);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn build(self) -> Result<StrategyEngine> {
        StrategyEngine::new(&self.config)
    }
}

// ============================================================
// PARALLEL BACKTESTING
// ============================================================

use rayon::prelude::*;

/// Outcome of backtesting a single configuration
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub config: StrategyConfig,
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub win_rate: Option<f64>,
}

/// Error from backtesting a single configuration
#[derive(Debug, Clone)]
pub struct SweepError {
    pub index: usize,
    pub error: StrategyError,
}

/// Backtest many configurations over the same series in parallel.
///
/// Each configuration gets a fresh engine, so results are identical to a
/// sequential run of the same list.
pub fn run_parallel(configs: &[StrategyConfig], bars: &[Bar]) -> (Vec<SweepResult>, Vec<SweepError>) {
    let results: Vec<_> = configs
        .par_iter()
        .enumerate()
        .map(|(index, config)| {
            run_single(config, bars).map_err(|error| SweepError { index, error })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

fn run_single(config: &StrategyConfig, bars: &[Bar]) -> Result<SweepResult> {
    let mut engine = StrategyEngine::new(config)?;
    engine.run(bars)?;
    let ledger = engine.ledger();
    Ok(SweepResult {
        config: config.clone(),
        total_trades: ledger.total_trades(),
        profitable_trades: ledger.profitable_trades(),
        win_rate: ledger.win_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + (i % 3) as f64 * 0.1;
                Bar::new(i as i64, base, base + 1.0, base - 1.0, base + 0.05, 1_000.0)
            })
            .collect()
    }

    #[test]
    fn ratio_rejects_out_of_range() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
    }

    #[test]
    fn period_rejects_zero() {
        assert!(Period::new(0).is_err());
        assert_eq!(Period::new(5).unwrap().get(), 5);
    }

    #[test]
    fn default_config_builds() {
        let engine = StrategyEngine::new(&StrategyConfig::default());
        assert!(engine.is_ok());
    }

    #[test]
    fn empty_config_is_rejected() {
        let config = StrategyConfig {
            patterns: Vec::new(),
            pivots: None,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            StrategyEngine::new(&config),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn builder_with_all_defaults_builds() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn quiet_series_trades_nothing() {
        let mut engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        engine.run(&flat_bars(100)).unwrap();
        assert_eq!(engine.ledger().total_trades(), 0);
        assert_eq!(engine.trade_state(), trade::TradeState::Flat);
    }

    #[test]
    fn non_monotonic_series_stops_the_run() {
        let mut engine = StrategyEngine::new(&StrategyConfig::default()).unwrap();
        let bars = vec![
            Bar::new(10, 100.0, 101.0, 99.0, 100.0, 1.0),
            Bar::new(5, 100.0, 101.0, 99.0, 100.0, 1.0),
        ];
        assert!(matches!(
            engine.run(&bars),
            Err(StrategyError::NonMonotonicTimestamp { last: 10, got: 5 })
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = StrategyConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn sweep_reports_bad_configs_by_index() {
        let good = StrategyConfig::default();
        let bad = StrategyConfig {
            consecutive_bars: 0,
            ..StrategyConfig::default()
        };
        let bars = flat_bars(20);
        let (results, errors) = run_parallel(&[good, bad], &bars);
        assert_eq!(results.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
    }
}
