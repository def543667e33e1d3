use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// Market numbers for a single simulated year, as arithmetic decimal returns
/// (0.07 = +7%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct YearMarket {
    pub stock_return: f64,
    pub bond_return: f64,
    pub cash_return: f64,
    pub inflation: f64,
}

impl YearMarket {
    /// Allocation-weighted nominal return of a portfolio holding this mix.
    pub fn combined_return(&self, allocation: &super::Allocation) -> f64 {
        allocation.stocks * self.stock_return
            + allocation.bonds * self.bond_return
            + allocation.cash * self.cash_return
    }

    /// Weighted return of the non-cash share alone. Used by strategies that
    /// react to invested-asset losses regardless of the cash cushion.
    pub fn non_cash_return(&self, allocation: &super::Allocation) -> f64 {
        let invested = allocation.stocks + allocation.bonds;
        if invested <= 0.0 {
            return 0.0;
        }
        (allocation.stocks * self.stock_return + allocation.bonds * self.bond_return) / invested
    }
}
