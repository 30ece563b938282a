//! Append-only record of completed round-trips.

use crate::trade::{ExitReason, TradeDirection};

/// One completed round-trip.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeRecord {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub exit_price: f64,
    pub reason: ExitReason,
    pub profitable: bool,
}

impl TradeRecord {
    pub fn new(
        direction: TradeDirection,
        entry_price: f64,
        exit_price: f64,
        reason: ExitReason,
    ) -> Self {
        let profitable = match direction {
            TradeDirection::Long => exit_price > entry_price,
            TradeDirection::Short => exit_price < entry_price,
        };
        Self {
            direction,
            entry_price,
            exit_price,
            reason,
            profitable,
        }
    }
}

/// Completed trades in close order. Records are never mutated or removed.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: TradeRecord) {
        self.records.push(record);
    }

    pub fn total_trades(&self) -> usize {
        self.records.len()
    }

    pub fn profitable_trades(&self) -> usize {
        self.records.iter().filter(|r| r.profitable).count()
    }

    /// Fraction of profitable trades; `None` with no trades rather than a
    /// division by zero.
    pub fn win_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        Some(self.profitable_trades() as f64 / self.records.len() as f64)
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }
}
