//! Signal aggregation
//!
//! Detectors fire on a single bar; the aggregator turns those per-bar
//! detections into entry triggers by requiring a run of consecutive
//! detections and, optionally, agreement from a confirmation indicator.

use crate::detectors::{Detector, PatternKind};
use crate::indicators::{Confirmation, ConfirmationReading};
use crate::window::BarWindow;
use crate::Direction;

/// Per-detector run of consecutive same-direction detections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalState {
    pub bullish_streak: usize,
    pub bearish_streak: usize,
}

impl SignalState {
    fn advance(&mut self, direction: Direction) {
        match direction {
            Direction::Bullish => {
                self.bullish_streak += 1;
                self.bearish_streak = 0;
            }
            Direction::Bearish => {
                self.bearish_streak += 1;
                self.bullish_streak = 0;
            }
            // A neutral detection (doji) marks indecision and feeds
            // neither side.
            Direction::Neutral => self.reset(),
        }
    }

    fn reset(&mut self) {
        self.bullish_streak = 0;
        self.bearish_streak = 0;
    }
}

/// Entry triggers produced for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Triggers {
    pub bullish: bool,
    pub bearish: bool,
    /// Pattern behind the trigger; bullish takes precedence when both fire.
    pub pattern: Option<PatternKind>,
}

/// Runs a set of detectors against the window each bar and tracks their
/// streaks independently; a streak reaching `consecutive_bars` raises the
/// matching trigger, gated by the confirmation when one is configured.
pub struct SignalAggregator {
    detectors: Vec<Detector>,
    states: Vec<SignalState>,
    consecutive_bars: usize,
    confirmation: Option<Box<dyn Confirmation>>,
}

impl SignalAggregator {
    pub fn new(
        detectors: Vec<Detector>,
        consecutive_bars: usize,
        confirmation: Option<Box<dyn Confirmation>>,
    ) -> Self {
        let states = vec![SignalState::default(); detectors.len()];
        Self {
            detectors,
            states,
            consecutive_bars: consecutive_bars.max(1),
            confirmation,
        }
    }

    /// Largest lookback any configured detector needs.
    pub fn min_bars(&self) -> usize {
        self.detectors
            .iter()
            .map(|d| d.min_bars())
            .max()
            .unwrap_or(1)
    }

    /// Process the window after a new bar has been pushed.
    pub fn on_bar(&mut self, window: &BarWindow) -> Triggers {
        // The confirmation sees every bar, including warm-up ones, so its
        // own state is current by the time a streak completes.
        let reading = match (&mut self.confirmation, window.latest()) {
            (Some(confirmation), Some(bar)) => confirmation.update(bar),
            (Some(_), None) => ConfirmationReading::NEUTRAL,
            (None, _) => ConfirmationReading {
                bullish: true,
                bearish: true,
            },
        };

        let mut triggers = Triggers::default();
        for (detector, state) in self.detectors.iter().zip(self.states.iter_mut()) {
            match detector.detect(window) {
                Some(result) => state.advance(result.direction),
                None => state.reset(),
            }
            if state.bullish_streak >= self.consecutive_bars && reading.bullish {
                triggers.bullish = true;
                if triggers.pattern.is_none() {
                    triggers.pattern = Some(detector.kind());
                }
            }
            if state.bearish_streak >= self.consecutive_bars && reading.bearish {
                triggers.bearish = true;
                if triggers.pattern.is_none() {
                    triggers.pattern = Some(detector.kind());
                }
            }
        }
        triggers
    }

    pub fn states(&self) -> &[SignalState] {
        &self.states
    }
}
