//! Request configurations for the three simulation modes.
//!
//! These are the JSON-facing types: everything derives serde, unknown
//! fields are rejected, and each config validates itself completely before
//! any trial runs so failures carry the offending field's path.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::error::{ConfigError, Result};
use crate::model::Allocation;
use crate::scenario::ScenarioConfig;
use crate::strategy::StrategyConfig;
use crate::tax::TaxConfig;

fn default_num_simulations() -> u32 {
    1
}

/// Starting portfolio: total value plus target allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct PortfolioConfig {
    pub value: f64,
    pub allocation: Allocation,
}

impl PortfolioConfig {
    fn validate(&self, field: &str) -> Result<()> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(ConfigError::new(
                format!("{field}.value"),
                format!("must be a finite amount >= 0, got {}", self.value),
            )
            .into());
        }
        self.allocation
            .validate(&format!("{field}.allocation"))
            .map_err(Into::into)
    }
}

/// Configuration for a withdrawal (retirement) run. Exactly one of
/// `strategy_config` (single mode) or `strategy_configs` (compare mode)
/// must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct WithdrawalConfig {
    pub initial_portfolio: PortfolioConfig,
    #[serde(default)]
    pub rebalance: bool,
    pub scenario_config: ScenarioConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_config: Option<StrategyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_configs: Option<Vec<StrategyConfig>>,
    pub tax_config: TaxConfig,
    pub simulation_years: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl WithdrawalConfig {
    /// The strategy list this run compares; length 1 in single mode.
    pub fn strategies(&self) -> Vec<&StrategyConfig> {
        match (&self.strategy_config, &self.strategy_configs) {
            (Some(single), _) => vec![single],
            (None, Some(list)) => list.iter().collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn is_compare(&self) -> bool {
        self.strategy_config.is_none() && self.strategy_configs.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        self.initial_portfolio.validate("initial_portfolio")?;
        validate_run_shape(self.simulation_years, self.num_simulations)?;
        self.scenario_config.validate()?;
        self.tax_config.validate()?;

        match (&self.strategy_config, &self.strategy_configs) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::new(
                    "strategy_configs",
                    "provide either strategy_config or strategy_configs, not both",
                )
                .into());
            }
            (None, None) => {
                return Err(ConfigError::new(
                    "strategy_config",
                    "a strategy is required (or strategy_configs for compare mode)",
                )
                .into());
            }
            (Some(single), None) => single.validate("strategy_config")?,
            (None, Some(list)) => {
                if list.is_empty() {
                    return Err(
                        ConfigError::new("strategy_configs", "must not be empty").into()
                    );
                }
                for (i, strategy) in list.iter().enumerate() {
                    strategy.validate(&format!("strategy_configs[{i}]"))?;
                }
            }
        }
        Ok(())
    }

    /// Validate and return the config with float noise ironed out (the
    /// allocation rescaled to sum to exactly 1).
    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        let mut normalized = self.clone();
        normalized.initial_portfolio.allocation =
            normalized.initial_portfolio.allocation.normalized();
        Ok(normalized)
    }
}

/// Configuration for an accumulation (savings) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct AccumulationConfig {
    pub initial_portfolio: PortfolioConfig,
    #[serde(default)]
    pub rebalance: bool,
    pub scenario_config: ScenarioConfig,
    pub tax_config: TaxConfig,
    pub simulation_years: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub monthly_savings: f64,
    #[serde(default)]
    pub annual_increase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
}

impl AccumulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.initial_portfolio.validate("initial_portfolio")?;
        validate_run_shape(self.simulation_years, self.num_simulations)?;
        self.scenario_config.validate()?;
        self.tax_config.validate()?;
        validate_savings_plan(
            self.monthly_savings,
            self.annual_increase,
            self.target_value,
        )
    }

    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        let mut normalized = self.clone();
        normalized.initial_portfolio.allocation =
            normalized.initial_portfolio.allocation.normalized();
        Ok(normalized)
    }
}

/// Configuration for a combined run: an accumulation phase whose ending
/// portfolios feed the withdrawal phase, per trial, on one continuous
/// scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CombinedConfig {
    pub initial_portfolio: PortfolioConfig,
    #[serde(default)]
    pub rebalance: bool,
    pub scenario_config: ScenarioConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_config: Option<StrategyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_configs: Option<Vec<StrategyConfig>>,
    pub tax_config: TaxConfig,
    pub accumulation_years: u32,
    pub retirement_years: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub monthly_savings: f64,
    #[serde(default)]
    pub annual_increase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
}

impl CombinedConfig {
    pub fn strategies(&self) -> Vec<&StrategyConfig> {
        match (&self.strategy_config, &self.strategy_configs) {
            (Some(single), _) => vec![single],
            (None, Some(list)) => list.iter().collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn is_compare(&self) -> bool {
        self.strategy_config.is_none() && self.strategy_configs.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        self.initial_portfolio.validate("initial_portfolio")?;
        if self.accumulation_years == 0 {
            return Err(
                ConfigError::new("accumulation_years", "must be at least 1").into()
            );
        }
        if self.retirement_years == 0 {
            return Err(ConfigError::new("retirement_years", "must be at least 1").into());
        }
        validate_run_shape(
            self.accumulation_years + self.retirement_years,
            self.num_simulations,
        )?;
        self.scenario_config.validate()?;
        self.tax_config.validate()?;
        validate_savings_plan(
            self.monthly_savings,
            self.annual_increase,
            self.target_value,
        )?;

        match (&self.strategy_config, &self.strategy_configs) {
            (Some(_), Some(_)) => Err(ConfigError::new(
                "strategy_configs",
                "provide either strategy_config or strategy_configs, not both",
            )
            .into()),
            (None, None) => Err(ConfigError::new(
                "strategy_config",
                "a strategy is required (or strategy_configs for compare mode)",
            )
            .into()),
            (Some(single), None) => single.validate("strategy_config").map_err(Into::into),
            (None, Some(list)) => {
                if list.is_empty() {
                    return Err(
                        ConfigError::new("strategy_configs", "must not be empty").into()
                    );
                }
                for (i, strategy) in list.iter().enumerate() {
                    strategy.validate(&format!("strategy_configs[{i}]"))?;
                }
                Ok(())
            }
        }
    }

    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        let mut normalized = self.clone();
        normalized.initial_portfolio.allocation =
            normalized.initial_portfolio.allocation.normalized();
        Ok(normalized)
    }
}

fn validate_run_shape(simulation_years: u32, num_simulations: u32) -> Result<()> {
    if simulation_years == 0 {
        return Err(ConfigError::new("simulation_years", "must be at least 1").into());
    }
    if num_simulations == 0 {
        return Err(ConfigError::new("num_simulations", "must be at least 1").into());
    }
    Ok(())
}

fn validate_savings_plan(
    monthly_savings: f64,
    annual_increase: f64,
    target_value: Option<f64>,
) -> Result<()> {
    if !monthly_savings.is_finite() || monthly_savings < 0.0 {
        return Err(ConfigError::new(
            "monthly_savings",
            format!("must be a finite amount >= 0, got {monthly_savings}"),
        )
        .into());
    }
    if !annual_increase.is_finite() || annual_increase < 0.0 {
        return Err(ConfigError::new(
            "annual_increase",
            format!("must be a finite rate >= 0, got {annual_increase}"),
        )
        .into());
    }
    if let Some(target) = target_value {
        if !target.is_finite() || target <= 0.0 {
            return Err(ConfigError::new(
                "target_value",
                format!("must be a finite amount > 0, got {target}"),
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_withdrawal() -> WithdrawalConfig {
        WithdrawalConfig {
            initial_portfolio: PortfolioConfig {
                value: 1_000_000.0,
                allocation: Allocation::new(0.6, 0.3, 0.1),
            },
            rebalance: false,
            scenario_config: ScenarioConfig::MonteCarlo {
                mean_stock_return: 0.07,
                std_stock_return: 0.15,
                mean_bond_return: 0.03,
                std_bond_return: 0.05,
                mean_inflation: 0.025,
                std_inflation: 0.01,
                cash_return: 0.0,
            },
            strategy_config: Some(StrategyConfig::FixedSwr {
                withdrawal_rate: 0.04,
                minimum_withdrawal: 0.0,
                maximum_withdrawal: None,
            }),
            strategy_configs: None,
            tax_config: TaxConfig {
                country: "none".into(),
                region: String::new(),
                adjust_brackets_with_inflation: false,
            },
            simulation_years: 30,
            num_simulations: 100,
            seed: Some(1),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_withdrawal().validate().is_ok());
    }

    #[test]
    fn strategy_is_required() {
        let mut config = base_withdrawal();
        config.strategy_config = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("strategy_config"));
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let mut config = base_withdrawal();
        config.strategy_config = None;
        config.strategy_configs = Some(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn both_strategy_fields_is_rejected() {
        let mut config = base_withdrawal();
        config.strategy_configs = Some(vec![StrategyConfig::ConstantDollar {
            withdrawal_amount: 40_000.0,
        }]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_years_is_rejected() {
        let mut config = base_withdrawal();
        config.simulation_years = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalization_rescales_allocation_noise() {
        let mut config = base_withdrawal();
        config.initial_portfolio.allocation =
            Allocation::new(0.6, 0.3, 0.1 + 2e-10);
        let normalized = config.normalized().unwrap();
        let sum = normalized.initial_portfolio.allocation.sum();
        assert!((sum - 1.0).abs() < f64::EPSILON * 4.0);
    }

    #[test]
    fn strategy_path_points_at_the_offending_entry() {
        let mut config = base_withdrawal();
        config.strategy_config = None;
        config.strategy_configs = Some(vec![
            StrategyConfig::ConstantDollar {
                withdrawal_amount: 40_000.0,
            },
            StrategyConfig::FixedSwr {
                withdrawal_rate: 2.0,
                minimum_withdrawal: 0.0,
                maximum_withdrawal: None,
            },
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("strategy_configs[1]"));
    }

    #[test]
    fn config_parses_from_json() {
        let json = r#"{
            "initial_portfolio": {
                "value": 750000,
                "allocation": {"stocks": 0.7, "bonds": 0.2, "cash": 0.1}
            },
            "scenario_config": {
                "scenario_type": "historical",
                "country": "spain",
                "chunk_years": 3,
                "cash_return": 0.01
            },
            "strategy_config": {
                "strategy_type": "constant_dollar",
                "withdrawal_amount": 32000
            },
            "tax_config": {"country": "spain", "region": "madrid"},
            "simulation_years": 35,
            "num_simulations": 500,
            "seed": 7
        }"#;
        let config: WithdrawalConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.is_compare());
        assert_eq!(config.strategies().len(), 1);
    }
}
