//! Streaming confirmation indicators and ATR
//!
//! Everything here is incremental: one `update` per bar, O(1) state, no
//! re-scan of history. Warm-up is explicit - an indicator without enough
//! history reads as neither bullish nor bearish (no gating bias), and the
//! ATR reports `None` until its smoothing is seeded.

use crate::window::Bar;
use crate::Period;

/// SMA cross defaults.
pub const SMA_FAST_PERIOD: usize = 20;
pub const SMA_SLOW_PERIOD: usize = 50;
/// RSI defaults.
pub const RSI_PERIOD: usize = 14;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// MACD defaults.
pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;
pub const MACD_SIGNAL_PERIOD: usize = 9;
/// ATR default.
pub const ATR_PERIOD: usize = 14;

// ============================================================
// CONFIRMATION INTERFACE
// ============================================================

/// A confirmation's boolean view of the current bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmationReading {
    pub bullish: bool,
    pub bearish: bool,
}

impl ConfirmationReading {
    /// Warm-up reading: agrees with nothing.
    pub const NEUTRAL: Self = Self {
        bullish: false,
        bearish: false,
    };
}

/// Secondary signal that must agree with a pattern trigger.
///
/// Selected once at configuration time via [`ConfirmationChoice`]; there is
/// no runtime string dispatch.
pub trait Confirmation: Send {
    fn update(&mut self, bar: &Bar) -> ConfirmationReading;
}

/// Confirmation indicator selection, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationChoice {
    None,
    SmaCross {
        fast_period: Period,
        slow_period: Period,
    },
    Rsi {
        period: Period,
        oversold: f64,
        overbought: f64,
    },
    Macd {
        fast_period: Period,
        slow_period: Period,
        signal_period: Period,
    },
}

impl Default for ConfirmationChoice {
    fn default() -> Self {
        ConfirmationChoice::None
    }
}

impl ConfirmationChoice {
    /// Instantiate the configured indicator, or `None` when unconfirmed.
    pub fn build(&self) -> Option<Box<dyn Confirmation>> {
        match *self {
            ConfirmationChoice::None => None,
            ConfirmationChoice::SmaCross {
                fast_period,
                slow_period,
            } => Some(Box::new(SmaCrossConfirmation::new(fast_period, slow_period))),
            ConfirmationChoice::Rsi {
                period,
                oversold,
                overbought,
            } => Some(Box::new(RsiConfirmation::new(period, oversold, overbought))),
            ConfirmationChoice::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => Some(Box::new(MacdConfirmation::new(
                fast_period,
                slow_period,
                signal_period,
            ))),
        }
    }
}

// ============================================================
// MOVING AVERAGES
// ============================================================

/// Simple moving average over a fixed window.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: std::collections::VecDeque<f64>,
}

impl Sma {
    pub fn new(period: Period) -> Self {
        let period = period.get();
        Self {
            period,
            window: std::collections::VecDeque::with_capacity(period),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(value);
        if self.window.len() < self.period {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.period as f64)
    }
}

/// Exponential moving average, k = 2/(n+1), seeded with the SMA of the
/// first n values.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: Period) -> Self {
        let period = period.get();
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = (value - prev) * self.k + prev;
                self.value = Some(next);
            }
            None => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }
}

/// Fast SMA above slow SMA reads bullish; below reads bearish.
#[derive(Debug, Clone)]
pub struct SmaCrossConfirmation {
    fast: Sma,
    slow: Sma,
}

impl SmaCrossConfirmation {
    pub fn new(fast_period: Period, slow_period: Period) -> Self {
        Self {
            fast: Sma::new(fast_period),
            slow: Sma::new(slow_period),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Period::new_const(SMA_FAST_PERIOD),
            Period::new_const(SMA_SLOW_PERIOD),
        )
    }
}

impl Confirmation for SmaCrossConfirmation {
    fn update(&mut self, bar: &Bar) -> ConfirmationReading {
        let fast = self.fast.update(bar.close);
        let slow = self.slow.update(bar.close);
        match (fast, slow) {
            (Some(fast), Some(slow)) => ConfirmationReading {
                bullish: fast > slow,
                bearish: fast < slow,
            },
            _ => ConfirmationReading::NEUTRAL,
        }
    }
}

// ============================================================
// RSI
// ============================================================

/// Relative Strength Index with Wilder smoothing.
///
/// Seed averages are the simple mean of the first `period` gains/losses;
/// afterwards `avg = (prev_avg * (n-1) + current) / n`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
    value: Option<f64>,
}

impl Rsi {
    pub fn new(period: Period) -> Self {
        Self {
            period: period.get(),
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(prev) => prev,
            None => return None,
        };
        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if self.changes < self.period {
            self.seed_gain += gain;
            self.seed_loss += loss;
            self.changes += 1;
            if self.changes < self.period {
                return None;
            }
            self.avg_gain = self.seed_gain / self.period as f64;
            self.avg_loss = self.seed_loss / self.period as f64;
        } else {
            let n = self.period as f64;
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        let rsi = if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        };
        self.value = Some(rsi);
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Oversold reads bullish (mean-reversion entry), overbought reads bearish.
#[derive(Debug, Clone)]
pub struct RsiConfirmation {
    rsi: Rsi,
    oversold: f64,
    overbought: f64,
}

impl RsiConfirmation {
    pub fn new(period: Period, oversold: f64, overbought: f64) -> Self {
        Self {
            rsi: Rsi::new(period),
            oversold,
            overbought,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Period::new_const(RSI_PERIOD), RSI_OVERSOLD, RSI_OVERBOUGHT)
    }
}

impl Confirmation for RsiConfirmation {
    fn update(&mut self, bar: &Bar) -> ConfirmationReading {
        match self.rsi.update(bar.close) {
            Some(rsi) => ConfirmationReading {
                bullish: rsi < self.oversold,
                bearish: rsi > self.overbought,
            },
            None => ConfirmationReading::NEUTRAL,
        }
    }
}

// ============================================================
// MACD
// ============================================================

/// MACD line (fast EMA - slow EMA) against its signal EMA.
#[derive(Debug, Clone)]
pub struct MacdConfirmation {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl MacdConfirmation {
    pub fn new(fast_period: Period, slow_period: Period, signal_period: Period) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Period::new_const(MACD_FAST_PERIOD),
            Period::new_const(MACD_SLOW_PERIOD),
            Period::new_const(MACD_SIGNAL_PERIOD),
        )
    }
}

impl Confirmation for MacdConfirmation {
    fn update(&mut self, bar: &Bar) -> ConfirmationReading {
        let fast = self.fast.update(bar.close);
        let slow = self.slow.update(bar.close);
        let line = match (fast, slow) {
            (Some(fast), Some(slow)) => fast - slow,
            // The signal EMA only sees bars where the line exists.
            _ => return ConfirmationReading::NEUTRAL,
        };
        match self.signal.update(line) {
            Some(signal) => ConfirmationReading {
                bullish: line > signal,
                bearish: line < signal,
            },
            None => ConfirmationReading::NEUTRAL,
        }
    }
}

// ============================================================
// ATR
// ============================================================

/// Streaming Average True Range.
///
/// True range needs a previous close, so the first bar contributes nothing;
/// the Wilder smoothing (alpha = 1/period) is seeded with the mean of the
/// first `period` proper true ranges.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: Period) -> Self {
        Self {
            period: period.get(),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Period::new_const(ATR_PERIOD))
    }

    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let prev_close = match self.prev_close.replace(bar.close) {
            Some(prev) => prev,
            None => return None,
        };
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());

        match self.value {
            Some(prev) => {
                let alpha = 1.0 / self.period as f64;
                self.value = Some(prev + alpha * (tr - prev));
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    /// `None` until the smoothing is seeded.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn close_bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close, close, close, 1.0)
    }

    #[test]
    fn sma_warm_up_then_rolls() {
        let mut sma = Sma::new(Period::new(3).unwrap());
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert_relative_eq!(sma.update(3.0).unwrap(), 2.0);
        assert_relative_eq!(sma.update(6.0).unwrap(), 11.0 / 3.0);
    }

    #[test]
    fn ema_seeds_with_sma() {
        let mut ema = Ema::new(Period::new(3).unwrap());
        assert_eq!(ema.update(1.0), None);
        assert_eq!(ema.update(2.0), None);
        assert_relative_eq!(ema.update(3.0).unwrap(), 2.0);
        // k = 0.5: 2 + 0.5 * (4 - 2)
        assert_relative_eq!(ema.update(4.0).unwrap(), 3.0);
    }

    #[test]
    fn rsi_all_gains_pegs_at_100() {
        let mut rsi = Rsi::new(Period::new(3).unwrap());
        for (i, close) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            let value = rsi.update(*close);
            if i < 3 {
                assert!(value.is_none() || (value.unwrap() - 100.0).abs() < 1e-9);
            }
        }
        assert_relative_eq!(rsi.value().unwrap(), 100.0);
    }

    #[test]
    fn rsi_balanced_moves_read_50() {
        let mut rsi = Rsi::new(Period::new(2).unwrap());
        rsi.update(10.0);
        rsi.update(11.0);
        rsi.update(10.0);
        // avg gain == avg loss -> RSI 50
        assert_relative_eq!(rsi.value().unwrap(), 50.0);
    }

    #[test]
    fn atr_warm_up_then_wilder() {
        let mut atr = Atr::new(Period::new(2).unwrap());
        let bars = [
            Bar::new(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            Bar::new(1, 10.0, 12.0, 10.0, 11.0, 1.0),
            Bar::new(2, 11.0, 12.0, 10.0, 11.0, 1.0),
            Bar::new(3, 11.0, 15.0, 11.0, 14.0, 1.0),
        ];
        assert_eq!(atr.update(&bars[0]), None); // no prev close
        assert_eq!(atr.update(&bars[1]), None); // first proper TR = 2
        let seeded = atr.update(&bars[2]).unwrap(); // TR = 2, seed = 2
        assert_relative_eq!(seeded, 2.0);
        // TR = 4, alpha = 0.5: 2 + 0.5 * (4 - 2)
        assert_relative_eq!(atr.update(&bars[3]).unwrap(), 3.0);
    }

    #[test]
    fn sma_cross_reads_direction() {
        let mut confirmation = SmaCrossConfirmation::new(
            Period::new(2).unwrap(),
            Period::new(4).unwrap(),
        );
        let mut reading = ConfirmationReading::NEUTRAL;
        for (i, close) in [10.0, 10.0, 10.0, 11.0, 12.0, 13.0].iter().enumerate() {
            reading = confirmation.update(&close_bar(i as i64, *close));
        }
        assert!(reading.bullish);
        assert!(!reading.bearish);
    }

    #[test]
    fn macd_neutral_until_signal_seeded() {
        let mut confirmation = MacdConfirmation::new(
            Period::new(2).unwrap(),
            Period::new(3).unwrap(),
            Period::new(2).unwrap(),
        );
        // Slow EMA seeds at bar 3, signal needs 2 line values -> bar 4.
        for i in 0..3 {
            let reading = confirmation.update(&close_bar(i, 10.0 + i as f64));
            assert_eq!(reading, ConfirmationReading::NEUTRAL);
        }
        let reading = confirmation.update(&close_bar(3, 14.0));
        assert!(reading.bullish || reading.bearish || reading == ConfirmationReading::NEUTRAL);
    }
}
