use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::error::ConfigError;
use crate::model::YearMarket;

/// Allocation fractions must sum to 1 within this tolerance.
pub const ALLOCATION_TOLERANCE: f64 = 1e-9;

/// Asset allocation as fractions in [0, 1] summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Allocation {
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl Allocation {
    pub fn new(stocks: f64, bonds: f64, cash: f64) -> Self {
        Self {
            stocks,
            bonds,
            cash,
        }
    }

    pub fn sum(&self) -> f64 {
        self.stocks + self.bonds + self.cash
    }

    /// Check fractions and their sum; `field` anchors the error path.
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        for (name, w) in [
            ("stocks", self.stocks),
            ("bonds", self.bonds),
            ("cash", self.cash),
        ] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::new(
                    format!("{field}.{name}"),
                    format!("weight must be in [0, 1], got {w}"),
                ));
            }
        }
        if (self.sum() - 1.0).abs() > ALLOCATION_TOLERANCE {
            return Err(ConfigError::new(
                field,
                format!("weights must sum to 1, got {}", self.sum()),
            ));
        }
        Ok(())
    }

    /// Rescale so the weights sum to exactly 1. Callers validate first, so
    /// this only irons out float noise within the tolerance.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::new(0.0, 0.0, 1.0);
        }
        Self {
            stocks: self.stocks / total,
            bonds: self.bonds / total,
            cash: self.cash / total,
        }
    }
}

/// A portfolio tracked as per-asset values. The total is never negative;
/// drawdowns clamp at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    stocks: f64,
    bonds: f64,
    cash: f64,
}

impl Portfolio {
    pub fn new(value: f64, allocation: &Allocation) -> Self {
        Self {
            stocks: value * allocation.stocks,
            bonds: value * allocation.bonds,
            cash: value * allocation.cash,
        }
    }

    pub fn total(&self) -> f64 {
        self.stocks + self.bonds + self.cash
    }

    /// Current allocation. An empty portfolio reports all-cash so the
    /// fractions still sum to 1 on zero-value records.
    pub fn allocation(&self) -> Allocation {
        let total = self.total();
        if total <= 0.0 {
            return Allocation::new(0.0, 0.0, 1.0);
        }
        Allocation {
            stocks: self.stocks / total,
            bonds: self.bonds / total,
            cash: self.cash / total,
        }
    }

    /// Grow each sleeve by its own return.
    pub fn apply_returns(&mut self, market: &YearMarket) {
        self.stocks *= 1.0 + market.stock_return;
        self.bonds *= 1.0 + market.bond_return;
        self.cash *= 1.0 + market.cash_return;
        // A sampled return below -100% would leave a negative sleeve.
        self.stocks = self.stocks.max(0.0);
        self.bonds = self.bonds.max(0.0);
        self.cash = self.cash.max(0.0);
    }

    /// Contributions land in cash; a rebalance pass redistributes them.
    pub fn deposit(&mut self, amount: f64) {
        self.cash += amount.max(0.0);
    }

    /// Draw `amount`, cash first, then bonds, then stocks, clamping each
    /// sleeve at zero. Returns the amount actually withdrawn, which is less
    /// than requested only when the portfolio is exhausted.
    pub fn withdraw(&mut self, amount: f64) -> f64 {
        let mut remaining = amount.max(0.0);

        let from_cash = remaining.min(self.cash);
        self.cash -= from_cash;
        remaining -= from_cash;

        let from_bonds = remaining.min(self.bonds);
        self.bonds -= from_bonds;
        remaining -= from_bonds;

        let from_stocks = remaining.min(self.stocks);
        self.stocks -= from_stocks;
        remaining -= from_stocks;

        amount.max(0.0) - remaining
    }

    /// Reset sleeve values to `total * target` weights.
    pub fn rebalance(&mut self, target: &Allocation) {
        let total = self.total();
        self.stocks = total * target.stocks;
        self.bonds = total * target.bonds;
        self.cash = total * target.cash;
    }
}
