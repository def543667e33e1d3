//! Shared fixtures for the integration tests.

use crate::config::{PortfolioConfig, WithdrawalConfig};
use crate::model::Allocation;
use crate::scenario::ScenarioConfig;
use crate::strategy::StrategyConfig;
use crate::tax::TaxConfig;

/// A Monte Carlo scenario with every distribution pinned to a constant.
pub fn flat_scenario(stock: f64, bond: f64, inflation: f64, cash: f64) -> ScenarioConfig {
    ScenarioConfig::MonteCarlo {
        mean_stock_return: stock,
        std_stock_return: 0.0,
        mean_bond_return: bond,
        std_bond_return: 0.0,
        mean_inflation: inflation,
        std_inflation: 0.0,
        cash_return: cash,
    }
}

/// A noisy Monte Carlo scenario for runs that should differ per trial.
pub fn noisy_scenario() -> ScenarioConfig {
    ScenarioConfig::MonteCarlo {
        mean_stock_return: 0.07,
        std_stock_return: 0.15,
        mean_bond_return: 0.03,
        std_bond_return: 0.05,
        mean_inflation: 0.025,
        std_inflation: 0.01,
        cash_return: 0.0,
    }
}

pub fn no_tax() -> TaxConfig {
    TaxConfig {
        country: "none".into(),
        region: String::new(),
        adjust_brackets_with_inflation: false,
    }
}

pub fn all_stocks(value: f64) -> PortfolioConfig {
    PortfolioConfig {
        value,
        allocation: Allocation::new(1.0, 0.0, 0.0),
    }
}

pub fn fixed_swr(rate: f64) -> StrategyConfig {
    StrategyConfig::FixedSwr {
        withdrawal_rate: rate,
        minimum_withdrawal: 0.0,
        maximum_withdrawal: None,
    }
}

pub fn withdrawal_config(
    portfolio: PortfolioConfig,
    scenario: ScenarioConfig,
    strategy: StrategyConfig,
    years: u32,
    simulations: u32,
    seed: u64,
) -> WithdrawalConfig {
    WithdrawalConfig {
        initial_portfolio: portfolio,
        rebalance: false,
        scenario_config: scenario,
        strategy_config: Some(strategy),
        strategy_configs: None,
        tax_config: no_tax(),
        simulation_years: years,
        num_simulations: simulations,
        seed: Some(seed),
    }
}
