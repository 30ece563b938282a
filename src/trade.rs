//! Trade lifecycle state machine
//!
//! Order fills are asynchronous from the caller's point of view: an entry
//! or exit decision moves the machine into a pending sub-state that ignores
//! further signals until [`TradeStateMachine::on_order_filled`] or
//! [`TradeStateMachine::on_order_cancelled`] resolves it. While a position
//! is open the exit rules are checked in a fixed precedence order and the
//! first one that holds wins:
//!
//! 1. take-profit
//! 2. ATR target
//! 3. trailing stop
//! 4. stop loss
//! 5. opposite signal
//!
//! A risk fraction of `0.0` disables its rule; the ATR target stays
//! inactive until the ATR smoothing has been seeded.

use crate::indicators::{Atr, ATR_PERIOD};
use crate::ledger::TradeRecord;
use crate::signal::Triggers;
use crate::window::Bar;
use crate::{Period, Result, StrategyError};

/// Default risk fractions.
pub const STOP_LOSS: f64 = 0.05;
pub const TAKE_PROFIT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
}

/// Which exit rule closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    AtrTarget,
    TrailingStop,
    StopLoss,
    OppositeSignal,
}

/// An open position. `favorable_price` only ever ratchets in the
/// position's favor and anchors the trailing stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub favorable_price: f64,
}

/// Risk configuration for the state machine.
///
/// `stop_loss`, `take_profit` and `trailing_stop` are fractions of the
/// reference price; zero disables the rule.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskParams {
    pub stop_loss: f64,
    pub take_profit: f64,
    pub trailing_stop: f64,
    pub atr_period: Period,
    pub atr_multiplier: f64,
    pub exit_on_opposite: bool,
    pub short_allowed: bool,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_loss: STOP_LOSS,
            take_profit: TAKE_PROFIT,
            trailing_stop: 0.0,
            atr_period: Period::new_const(ATR_PERIOD),
            atr_multiplier: 0.0,
            exit_on_opposite: true,
            short_allowed: false,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("trailing_stop", self.trailing_stop),
        ] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(StrategyError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if !self.atr_multiplier.is_finite() || self.atr_multiplier < 0.0 {
            return Err(StrategyError::OutOfRange {
                field: "atr_multiplier",
                value: self.atr_multiplier,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(())
    }
}

/// Order request emitted toward the execution layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeIntent {
    Enter(TradeDirection),
    Exit(ExitReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeState {
    Flat,
    PendingEntry(TradeDirection),
    Open,
    PendingExit(ExitReason),
}

pub struct TradeStateMachine {
    params: RiskParams,
    atr: Atr,
    state: TradeState,
    position: Option<Position>,
}

impl TradeStateMachine {
    pub fn new(params: RiskParams) -> Result<Self> {
        params.validate()?;
        let atr = Atr::new(params.atr_period);
        Ok(Self {
            params,
            atr,
            state: TradeState::Flat,
            position: None,
        })
    }

    pub fn state(&self) -> TradeState {
        self.state
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn atr_value(&self) -> Option<f64> {
        self.atr.value()
    }

    /// Advance one bar. Returns the order intent to submit, if any.
    pub fn on_bar(&mut self, bar: &Bar, triggers: Triggers) -> Option<TradeIntent> {
        // The ATR tracks every bar regardless of state.
        self.atr.update(bar);

        match self.state {
            // An outstanding order blocks all decisions until resolved.
            TradeState::PendingEntry(_) | TradeState::PendingExit(_) => None,
            TradeState::Flat => {
                if triggers.bullish {
                    self.state = TradeState::PendingEntry(TradeDirection::Long);
                    Some(TradeIntent::Enter(TradeDirection::Long))
                } else if triggers.bearish && self.params.short_allowed {
                    self.state = TradeState::PendingEntry(TradeDirection::Short);
                    Some(TradeIntent::Enter(TradeDirection::Short))
                } else {
                    None
                }
            }
            TradeState::Open => {
                let position = self.position.as_mut()?;
                match position.direction {
                    TradeDirection::Long => {
                        position.favorable_price = position.favorable_price.max(bar.close);
                    }
                    TradeDirection::Short => {
                        position.favorable_price = position.favorable_price.min(bar.close);
                    }
                }
                let reason =
                    exit_reason(&self.params, *position, bar.close, self.atr.value(), triggers)?;
                self.state = TradeState::PendingExit(reason);
                Some(TradeIntent::Exit(reason))
            }
        }
    }

    /// Resolve the outstanding order at `price`. An entry fill opens the
    /// position; an exit fill flattens it and yields the completed record.
    pub fn on_order_filled(&mut self, price: f64) -> Option<TradeRecord> {
        match self.state {
            TradeState::PendingEntry(direction) => {
                self.position = Some(Position {
                    direction,
                    entry_price: price,
                    favorable_price: price,
                });
                self.state = TradeState::Open;
                None
            }
            TradeState::PendingExit(reason) => {
                let position = self.position.take()?;
                self.state = TradeState::Flat;
                Some(TradeRecord::new(
                    position.direction,
                    position.entry_price,
                    price,
                    reason,
                ))
            }
            TradeState::Flat | TradeState::Open => None,
        }
    }

    /// Abandon the outstanding order, restoring the previous state.
    pub fn on_order_cancelled(&mut self) {
        match self.state {
            TradeState::PendingEntry(_) => self.state = TradeState::Flat,
            TradeState::PendingExit(_) => self.state = TradeState::Open,
            TradeState::Flat | TradeState::Open => {}
        }
    }
}

/// First exit rule that holds, in precedence order.
fn exit_reason(
    params: &RiskParams,
    position: Position,
    close: f64,
    atr: Option<f64>,
    triggers: Triggers,
) -> Option<ExitReason> {
    let entry = position.entry_price;
    let long = position.direction == TradeDirection::Long;

    if params.take_profit > 0.0 {
        let target = if long {
            entry * (1.0 + params.take_profit)
        } else {
            entry * (1.0 - params.take_profit)
        };
        if (long && close >= target) || (!long && close <= target) {
            return Some(ExitReason::TakeProfit);
        }
    }
    if params.atr_multiplier > 0.0 {
        if let Some(atr) = atr {
            let target = if long {
                entry + params.atr_multiplier * atr
            } else {
                entry - params.atr_multiplier * atr
            };
            if (long && close >= target) || (!long && close <= target) {
                return Some(ExitReason::AtrTarget);
            }
        }
    }
    if params.trailing_stop > 0.0 {
        let stop = if long {
            position.favorable_price * (1.0 - params.trailing_stop)
        } else {
            position.favorable_price * (1.0 + params.trailing_stop)
        };
        if (long && close <= stop) || (!long && close >= stop) {
            return Some(ExitReason::TrailingStop);
        }
    }
    if params.stop_loss > 0.0 {
        let stop = if long {
            entry * (1.0 - params.stop_loss)
        } else {
            entry * (1.0 + params.stop_loss)
        };
        if (long && close <= stop) || (!long && close >= stop) {
            return Some(ExitReason::StopLoss);
        }
    }
    if params.exit_on_opposite {
        let opposite = if long { triggers.bearish } else { triggers.bullish };
        if opposite {
            return Some(ExitReason::OppositeSignal);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 1.0)
    }

    fn bullish_triggers() -> Triggers {
        Triggers {
            bullish: true,
            bearish: false,
            pattern: None,
        }
    }

    fn bearish_triggers() -> Triggers {
        Triggers {
            bullish: false,
            bearish: true,
            pattern: None,
        }
    }

    fn open_long(machine: &mut TradeStateMachine, entry: f64) {
        let intent = machine.on_bar(&close_bar(0, entry), bullish_triggers());
        assert_eq!(intent, Some(TradeIntent::Enter(TradeDirection::Long)));
        assert!(machine.on_order_filled(entry).is_none());
        assert_eq!(machine.state(), TradeState::Open);
    }

    #[test]
    fn pending_entry_ignores_signals() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        let intent = machine.on_bar(&close_bar(0, 100.0), bullish_triggers());
        assert_eq!(intent, Some(TradeIntent::Enter(TradeDirection::Long)));
        // Still pending: nothing may happen, trigger or not.
        let intent = machine.on_bar(&close_bar(1, 100.0), bullish_triggers());
        assert_eq!(intent, None);
        assert_eq!(machine.state(), TradeState::PendingEntry(TradeDirection::Long));
    }

    #[test]
    fn shorts_require_permission() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        assert_eq!(machine.on_bar(&close_bar(0, 100.0), bearish_triggers()), None);

        let params = RiskParams {
            short_allowed: true,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        assert_eq!(
            machine.on_bar(&close_bar(0, 100.0), bearish_triggers()),
            Some(TradeIntent::Enter(TradeDirection::Short))
        );
    }

    #[test]
    fn take_profit_fires_at_threshold() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        open_long(&mut machine, 100.0);
        assert_eq!(machine.on_bar(&close_bar(1, 105.0), Triggers::default()), None);
        assert_eq!(
            machine.on_bar(&close_bar(2, 110.0), Triggers::default()),
            Some(TradeIntent::Exit(ExitReason::TakeProfit))
        );
        let record = machine.on_order_filled(110.0).unwrap();
        assert!(record.profitable);
        assert_eq!(record.reason, ExitReason::TakeProfit);
        assert_eq!(machine.state(), TradeState::Flat);
    }

    #[test]
    fn take_profit_outranks_opposite_signal() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        open_long(&mut machine, 100.0);
        // Both rules hold on the same bar; precedence picks take-profit.
        assert_eq!(
            machine.on_bar(&close_bar(1, 111.0), bearish_triggers()),
            Some(TradeIntent::Exit(ExitReason::TakeProfit))
        );
    }

    #[test]
    fn stop_loss_closes_a_losing_long() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        open_long(&mut machine, 100.0);
        assert_eq!(
            machine.on_bar(&close_bar(1, 94.0), Triggers::default()),
            Some(TradeIntent::Exit(ExitReason::StopLoss))
        );
        let record = machine.on_order_filled(94.0).unwrap();
        assert!(!record.profitable);
    }

    #[test]
    fn zero_take_profit_disables_the_rule() {
        let params = RiskParams {
            take_profit: 0.0,
            exit_on_opposite: false,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        open_long(&mut machine, 100.0);
        assert_eq!(machine.on_bar(&close_bar(1, 150.0), Triggers::default()), None);
    }

    #[test]
    fn trailing_stop_follows_the_favorable_price() {
        let params = RiskParams {
            take_profit: 0.0,
            stop_loss: 0.0,
            trailing_stop: 0.05,
            exit_on_opposite: false,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        open_long(&mut machine, 100.0);
        // Run up to 120, then give back more than 5% from the peak.
        assert_eq!(machine.on_bar(&close_bar(1, 120.0), Triggers::default()), None);
        assert_eq!(machine.on_bar(&close_bar(2, 115.0), Triggers::default()), None);
        assert_eq!(
            machine.on_bar(&close_bar(3, 113.0), Triggers::default()),
            Some(TradeIntent::Exit(ExitReason::TrailingStop))
        );
    }

    #[test]
    fn trailing_stop_outranks_fixed_stop() {
        // Take-profit can never lose a same-bar race: the peak ratchet and
        // the exit check share the bar's close, so it fires on the peak bar
        // itself. The realizable same-bar pair is trailing stop vs fixed
        // stop, pinned here.
        let params = RiskParams {
            take_profit: 0.0,
            stop_loss: 0.10,
            trailing_stop: 0.05,
            exit_on_opposite: false,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        open_long(&mut machine, 100.0);
        assert_eq!(machine.on_bar(&close_bar(1, 110.0), Triggers::default()), None);
        // One crash bar breaches both the trailing level (104.5) and the
        // fixed stop (90.0); precedence picks the trailing stop.
        assert_eq!(
            machine.on_bar(&close_bar(2, 85.0), Triggers::default()),
            Some(TradeIntent::Exit(ExitReason::TrailingStop))
        );
        let record = machine.on_order_filled(85.0).unwrap();
        assert_eq!(record.reason, ExitReason::TrailingStop);
        assert!(!record.profitable);
    }

    #[test]
    fn opposite_signal_exit_respects_the_flag() {
        let params = RiskParams {
            exit_on_opposite: false,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        open_long(&mut machine, 100.0);
        assert_eq!(machine.on_bar(&close_bar(1, 101.0), bearish_triggers()), None);
    }

    #[test]
    fn atr_target_waits_for_seeding() {
        let params = RiskParams {
            take_profit: 0.0,
            stop_loss: 0.0,
            exit_on_opposite: false,
            atr_period: Period::new_const(3),
            atr_multiplier: 1.0,
            ..RiskParams::default()
        };
        let mut machine = TradeStateMachine::new(params).unwrap();
        open_long(&mut machine, 100.0);
        // Bars 1-3 seed the ATR (each true range is 2.0 with these bars);
        // the target only becomes active once the seed completes.
        assert_eq!(machine.on_bar(&close_bar(1, 101.0), Triggers::default()), None);
        assert_eq!(machine.on_bar(&close_bar(2, 101.5), Triggers::default()), None);
        assert!(machine.atr_value().is_none());
        let intent = machine.on_bar(&close_bar(3, 104.0), Triggers::default());
        assert!(machine.atr_value().is_some());
        assert_eq!(intent, Some(TradeIntent::Exit(ExitReason::AtrTarget)));
    }

    #[test]
    fn cancelled_entry_returns_to_flat() {
        let mut machine = TradeStateMachine::new(RiskParams::default()).unwrap();
        let _ = machine.on_bar(&close_bar(0, 100.0), bullish_triggers());
        machine.on_order_cancelled();
        assert_eq!(machine.state(), TradeState::Flat);
        assert!(machine.position().is_none());
    }

    #[test]
    fn rejects_out_of_range_fractions() {
        let params = RiskParams {
            stop_loss: 1.5,
            ..RiskParams::default()
        };
        assert!(TradeStateMachine::new(params).is_err());
    }
}
