//! The kernel's entry surface: validated configs in, aggregated results out.
//!
//! Every `run_*` operation validates and normalizes its config, fans trials
//! out over the worker pool, and aggregates per-strategy. The `*_cancellable`
//! variants accept a [`CancelToken`]; the plain ones run to completion.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::aggregate::{Aggregate, aggregate};
use crate::config::{AccumulationConfig, CombinedConfig, WithdrawalConfig};
use crate::error::Result;
use crate::model::SimulationReport;
use crate::simulation::{
    CancelToken, run_accumulation_trials, run_combined_trials, run_withdrawal_trials,
};

pub use crate::data::{list_countries, list_tax_regions};

/// Top-level result summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Summary {
    pub num_simulations: u32,
    /// Fraction of trials achieving their goal; in compare mode, of the
    /// first strategy.
    pub success_rate: f64,
    pub simulation_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_time_to_target: Option<f64>,
    /// Present in compare mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_summaries: Option<Vec<StrategySummary>>,
}

/// One row of the compare-mode summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct StrategySummary {
    pub label: String,
    pub num_simulations: u32,
    pub success_rate: f64,
}

/// One strategy's trials and their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct StrategyRun {
    pub label: String,
    pub aggregate: Aggregate,
    pub reports: Vec<SimulationReport>,
}

/// Result of a withdrawal run. `runs` has one entry in single mode, one per
/// strategy in compare mode; paired trials share scenarios across entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct WithdrawalResult {
    pub summary: Summary,
    pub runs: Vec<StrategyRun>,
}

/// Result of an accumulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct AccumulationResult {
    pub summary: Summary,
    pub aggregate: Aggregate,
    pub reports: Vec<SimulationReport>,
}

/// Result of a combined accumulation-then-withdrawal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CombinedResult {
    pub summary: Summary,
    pub accumulation_years: u32,
    pub retirement_years: u32,
    pub runs: Vec<StrategyRun>,
}

fn strategy_runs(
    labels: Vec<String>,
    reports_by_strategy: Vec<Vec<SimulationReport>>,
    simulation_years: u32,
) -> Vec<StrategyRun> {
    labels
        .into_iter()
        .zip(reports_by_strategy)
        .map(|(label, reports)| StrategyRun {
            label,
            aggregate: aggregate(&reports, simulation_years),
            reports,
        })
        .collect()
}

fn compare_summaries(runs: &[StrategyRun], num_simulations: u32) -> Option<Vec<StrategySummary>> {
    if runs.len() < 2 {
        return None;
    }
    Some(
        runs.iter()
            .map(|run| StrategySummary {
                label: run.label.clone(),
                num_simulations,
                success_rate: run.aggregate.success_rate,
            })
            .collect(),
    )
}

/// Validate a withdrawal config and return the normalized form.
pub fn validate_withdrawal(config: &WithdrawalConfig) -> Result<WithdrawalConfig> {
    config.normalized()
}

/// Validate an accumulation config and return the normalized form.
pub fn validate_accumulation(config: &AccumulationConfig) -> Result<AccumulationConfig> {
    config.normalized()
}

/// Validate a combined config and return the normalized form.
pub fn validate_combined(config: &CombinedConfig) -> Result<CombinedConfig> {
    config.normalized()
}

/// Run a withdrawal simulation to completion.
pub fn run_withdrawal(config: &WithdrawalConfig) -> Result<WithdrawalResult> {
    run_withdrawal_cancellable(config, &CancelToken::new())
}

/// Run a withdrawal simulation with cooperative cancellation.
pub fn run_withdrawal_cancellable(
    config: &WithdrawalConfig,
    cancel: &CancelToken,
) -> Result<WithdrawalResult> {
    let config = config.normalized()?;
    let labels: Vec<String> = config.strategies().iter().map(|s| s.label()).collect();

    let reports_by_strategy = run_withdrawal_trials(&config, cancel)?;
    let runs = strategy_runs(labels, reports_by_strategy, config.simulation_years);

    let summary = Summary {
        num_simulations: config.num_simulations,
        success_rate: runs.first().map(|r| r.aggregate.success_rate).unwrap_or(0.0),
        simulation_years: config.simulation_years,
        median_time_to_target: None,
        strategy_summaries: compare_summaries(&runs, config.num_simulations),
    };

    Ok(WithdrawalResult { summary, runs })
}

/// Run an accumulation simulation to completion.
pub fn run_accumulation(config: &AccumulationConfig) -> Result<AccumulationResult> {
    run_accumulation_cancellable(config, &CancelToken::new())
}

/// Run an accumulation simulation with cooperative cancellation.
pub fn run_accumulation_cancellable(
    config: &AccumulationConfig,
    cancel: &CancelToken,
) -> Result<AccumulationResult> {
    let config = config.normalized()?;
    let reports = run_accumulation_trials(&config, cancel)?;
    let aggregate = aggregate(&reports, config.simulation_years);

    let summary = Summary {
        num_simulations: config.num_simulations,
        success_rate: aggregate.success_rate,
        simulation_years: config.simulation_years,
        median_time_to_target: aggregate.median_time_to_target,
        strategy_summaries: None,
    };

    Ok(AccumulationResult {
        summary,
        aggregate,
        reports,
    })
}

/// Run a combined simulation to completion.
pub fn run_combined(config: &CombinedConfig) -> Result<CombinedResult> {
    run_combined_cancellable(config, &CancelToken::new())
}

/// Run a combined simulation with cooperative cancellation.
pub fn run_combined_cancellable(
    config: &CombinedConfig,
    cancel: &CancelToken,
) -> Result<CombinedResult> {
    let config = config.normalized()?;
    let total_years = config.accumulation_years + config.retirement_years;
    let labels: Vec<String> = config.strategies().iter().map(|s| s.label()).collect();

    let reports_by_strategy = run_combined_trials(&config, cancel)?;
    let runs = strategy_runs(labels, reports_by_strategy, total_years);

    let median_time_to_target = runs
        .first()
        .and_then(|r| r.aggregate.median_time_to_target);

    let summary = Summary {
        num_simulations: config.num_simulations,
        success_rate: runs.first().map(|r| r.aggregate.success_rate).unwrap_or(0.0),
        simulation_years: total_years,
        median_time_to_target,
        strategy_summaries: compare_summaries(&runs, config.num_simulations),
    };

    Ok(CombinedResult {
        summary,
        accumulation_years: config.accumulation_years,
        retirement_years: config.retirement_years,
        runs,
    })
}
