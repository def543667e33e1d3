use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::model::Allocation;

/// One year of simulation output. Monetary fields are nominal unless
/// prefixed `real_`; real values divide by cumulative inflation through the
/// same year.
///
/// In withdrawal years `net_income = gross_income - capital_gains_tax -
/// wealth_tax`. In accumulation years there is no gross withdrawal, so
/// `gross_income`, `capital_gains_tax` and `net_income` are zero and only
/// `contribution` and `wealth_tax` carry money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct YearRecord {
    /// 1-based year index within the trial.
    pub year: u32,
    /// Portfolio value at year end, clamped at zero on depletion.
    pub portfolio_value: f64,
    pub allocation: Allocation,
    pub stock_return: f64,
    pub bond_return: f64,
    pub cash_return: f64,
    pub inflation: f64,
    /// Allocation-weighted nominal return, using start-of-year weights.
    pub combined_return: f64,
    pub contribution: f64,
    pub gross_income: f64,
    pub capital_gains_tax: f64,
    pub wealth_tax: f64,
    pub net_income: f64,
    pub real_portfolio_value: f64,
    pub real_contribution: f64,
    pub real_gross_income: f64,
    pub real_net_income: f64,
    pub real_capital_gains_tax: f64,
    pub real_wealth_tax: f64,
    /// Solvent through the end of this year.
    pub goal_achieved: bool,
}

impl YearRecord {
    pub fn total_tax(&self) -> f64 {
        self.capital_gains_tax + self.wealth_tax
    }
}

/// Full report for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct SimulationReport {
    pub goal_achieved: bool,
    pub final_portfolio_value: f64,
    pub final_real_portfolio_value: f64,
    /// First accumulation year whose end value reached the target, if any.
    pub time_to_target: Option<u32>,
    pub yearly_records: Vec<YearRecord>,
}

impl SimulationReport {
    /// First year the portfolio fell below solvency, if it ever did.
    pub fn failure_year(&self) -> Option<u32> {
        self.yearly_records
            .iter()
            .find(|r| r.portfolio_value < 1.0)
            .map(|r| r.year)
    }
}
