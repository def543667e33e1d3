//! The per-trial state machine and the Monte-Carlo fan-out.
//!
//! A trial advances one year at a time: apply market returns, ask the
//! strategy for a cash flow, settle taxes, optionally rebalance, record the
//! year. Depletion is an outcome, not an error: once the portfolio drops
//! below the solvency floor the remaining years are emitted as zero-value
//! records so year axes stay aligned across trials.
//!
//! Trials are embarrassingly parallel. The runner fans them out over rayon,
//! derives each trial's seed purely from (master seed, trial index), and
//! collects results back into their original indices, so output is
//! deterministic no matter how workers interleave. In compare mode every
//! strategy replays the same per-trial scenario (paired samples).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::info;

use crate::config::{AccumulationConfig, CombinedConfig, PortfolioConfig, WithdrawalConfig};
use crate::error::{KernelError, Result};
use crate::model::{Allocation, Portfolio, SimulationReport, YearMarket, YearRecord};
use crate::scenario::Scenario;
use crate::strategy::{StrategyConfig, StrategyState, YearContext, contribution};
use crate::tax::TaxEngine;

/// A portfolio below one currency unit counts as depleted.
const SOLVENCY_FLOOR: f64 = 1.0;

/// Cooperative cancellation flag, polled between trials (never within one).
/// Cancelling discards all partial work; the run fails with
/// [`KernelError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Per-trial seeds are drawn up front from a master RNG, making trial `i`'s
/// seed a pure function of (master seed, i) and never of the strategy list.
pub(crate) fn trial_seeds(master_seed: u64, count: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    (0..count).map(|_| rng.next_u64()).collect()
}

struct TrialState {
    portfolio: Portfolio,
    target_allocation: Allocation,
    rebalance: bool,
    cumulative_inflation: f64,
    failed: bool,
    time_to_target: Option<u32>,
    records: Vec<YearRecord>,
}

impl TrialState {
    fn new(initial: &PortfolioConfig, rebalance: bool, years: u32) -> Self {
        Self {
            portfolio: Portfolio::new(initial.value, &initial.allocation),
            target_allocation: initial.allocation,
            rebalance,
            cumulative_inflation: 1.0,
            failed: false,
            time_to_target: None,
            records: Vec::with_capacity(years as usize),
        }
    }

    /// Record for a year after depletion: the market still moves, the
    /// portfolio stays at zero.
    fn push_depleted_record(&mut self, year: u32, market: &YearMarket) {
        self.records.push(YearRecord {
            year,
            portfolio_value: 0.0,
            allocation: Allocation::new(0.0, 0.0, 1.0),
            stock_return: market.stock_return,
            bond_return: market.bond_return,
            cash_return: market.cash_return,
            inflation: market.inflation,
            combined_return: 0.0,
            contribution: 0.0,
            gross_income: 0.0,
            capital_gains_tax: 0.0,
            wealth_tax: 0.0,
            net_income: 0.0,
            real_portfolio_value: 0.0,
            real_contribution: 0.0,
            real_gross_income: 0.0,
            real_net_income: 0.0,
            real_capital_gains_tax: 0.0,
            real_wealth_tax: 0.0,
            goal_achieved: false,
        });
    }

    /// One withdrawal year. `phase_year` is 1-based within the withdrawal
    /// phase (strategies count from retirement start); `record_year` is the
    /// trial-global year index.
    fn withdrawal_year(
        &mut self,
        market: &YearMarket,
        record_year: u32,
        phase_year: u32,
        strategy: &StrategyConfig,
        strategy_state: &mut StrategyState,
        tax: &TaxEngine,
    ) {
        let previous_inflation = self.cumulative_inflation;
        self.cumulative_inflation *= 1.0 + market.inflation;
        let cumulative = self.cumulative_inflation;

        if self.failed {
            self.push_depleted_record(record_year, market);
            return;
        }

        let start_value = self.portfolio.total();
        let start_allocation = self.portfolio.allocation();
        let combined_return = market.combined_return(&start_allocation);

        self.portfolio.apply_returns(market);
        let value = self.portfolio.total();

        let ctx = YearContext {
            year: phase_year,
            market,
            allocation: start_allocation,
            start_value,
            value,
            cumulative_inflation: cumulative,
        };
        let net_target = strategy.target_net(strategy_state, &ctx);
        // Wealth tax is assessed on the grown portfolio; brackets are
        // indexed at last year's price level.
        let gross = tax
            .gross_for_net(net_target, value, previous_inflation)
            .min(value);
        let assessment = tax.assess(gross, value, previous_inflation);
        // The gross withdrawal normally covers both taxes. If it does not
        // (a zero income target still owes the wealth levy), the remainder
        // is drawn from the portfolio directly.
        let tax_shortfall =
            (assessment.capital_gains_tax + assessment.wealth_tax - gross).max(0.0);
        self.portfolio.withdraw(gross + tax_shortfall);
        strategy.record_outcome(strategy_state, &ctx, assessment.net_income);

        if self.rebalance {
            self.portfolio.rebalance(&self.target_allocation);
        }

        let end_value = self.portfolio.total();
        if end_value < SOLVENCY_FLOOR {
            self.failed = true;
        }

        self.records.push(YearRecord {
            year: record_year,
            portfolio_value: end_value,
            allocation: self.portfolio.allocation(),
            stock_return: market.stock_return,
            bond_return: market.bond_return,
            cash_return: market.cash_return,
            inflation: market.inflation,
            combined_return,
            contribution: 0.0,
            gross_income: gross,
            capital_gains_tax: assessment.capital_gains_tax,
            wealth_tax: assessment.wealth_tax,
            net_income: assessment.net_income,
            real_portfolio_value: end_value / cumulative,
            real_contribution: 0.0,
            real_gross_income: gross / cumulative,
            real_net_income: assessment.net_income / cumulative,
            real_capital_gains_tax: assessment.capital_gains_tax / cumulative,
            real_wealth_tax: assessment.wealth_tax / cumulative,
            goal_achieved: !self.failed,
        });
    }

    /// One accumulation year: returns, then the year's contributions, then
    /// wealth tax. Nothing is realised while saving, so capital-gains tax
    /// is zero by construction.
    fn accumulation_year(
        &mut self,
        market: &YearMarket,
        record_year: u32,
        phase_year: u32,
        monthly_savings: f64,
        annual_increase: f64,
        target_value: Option<f64>,
        tax: &TaxEngine,
    ) {
        let previous_inflation = self.cumulative_inflation;
        self.cumulative_inflation *= 1.0 + market.inflation;
        let cumulative = self.cumulative_inflation;

        if self.failed {
            self.push_depleted_record(record_year, market);
            return;
        }

        let start_allocation = self.portfolio.allocation();
        let combined_return = market.combined_return(&start_allocation);

        self.portfolio.apply_returns(market);
        let contribution_amount = contribution(monthly_savings, annual_increase, phase_year);
        self.portfolio.deposit(contribution_amount);

        let wealth_tax = tax.wealth_tax(self.portfolio.total(), previous_inflation);
        self.portfolio.withdraw(wealth_tax);

        if self.rebalance {
            self.portfolio.rebalance(&self.target_allocation);
        }

        let end_value = self.portfolio.total();
        if let Some(target) = target_value {
            if self.time_to_target.is_none() && end_value >= target {
                self.time_to_target = Some(record_year);
            }
        }
        if end_value < SOLVENCY_FLOOR {
            self.failed = true;
        }

        self.records.push(YearRecord {
            year: record_year,
            portfolio_value: end_value,
            allocation: self.portfolio.allocation(),
            stock_return: market.stock_return,
            bond_return: market.bond_return,
            cash_return: market.cash_return,
            inflation: market.inflation,
            combined_return,
            contribution: contribution_amount,
            gross_income: 0.0,
            capital_gains_tax: 0.0,
            wealth_tax,
            net_income: 0.0,
            real_portfolio_value: end_value / cumulative,
            real_contribution: contribution_amount / cumulative,
            real_gross_income: 0.0,
            real_net_income: 0.0,
            real_capital_gains_tax: 0.0,
            real_wealth_tax: wealth_tax / cumulative,
            goal_achieved: !self.failed,
        });
    }

    fn into_report(self, goal_achieved: bool) -> SimulationReport {
        let (final_value, final_real) = self
            .records
            .last()
            .map(|r| (r.portfolio_value, r.real_portfolio_value))
            .unwrap_or((0.0, 0.0));
        SimulationReport {
            goal_achieved,
            final_portfolio_value: final_value,
            final_real_portfolio_value: final_real,
            time_to_target: self.time_to_target,
            yearly_records: self.records,
        }
    }
}

fn withdrawal_trial(
    config: &WithdrawalConfig,
    strategy: &StrategyConfig,
    mut scenario: Scenario,
    tax: &TaxEngine,
) -> SimulationReport {
    let years = config.simulation_years;
    let mut state = TrialState::new(&config.initial_portfolio, config.rebalance, years);
    let mut strategy_state = strategy.initial_state(config.initial_portfolio.value);

    for year in 1..=years {
        let Some(market) = scenario.next() else { break };
        state.withdrawal_year(&market, year, year, strategy, &mut strategy_state, tax);
    }

    let goal = !state.failed;
    state.into_report(goal)
}

fn accumulation_trial(
    config: &AccumulationConfig,
    mut scenario: Scenario,
    tax: &TaxEngine,
) -> SimulationReport {
    let years = config.simulation_years;
    let mut state = TrialState::new(&config.initial_portfolio, config.rebalance, years);

    for year in 1..=years {
        let Some(market) = scenario.next() else { break };
        state.accumulation_year(
            &market,
            year,
            year,
            config.monthly_savings,
            config.annual_increase,
            config.target_value,
            tax,
        );
    }

    let goal = match config.target_value {
        Some(_) => state.time_to_target.is_some(),
        None => !state.failed,
    };
    state.into_report(goal)
}

fn combined_trial(
    config: &CombinedConfig,
    strategy: &StrategyConfig,
    mut scenario: Scenario,
    tax: &TaxEngine,
) -> SimulationReport {
    let total_years = config.accumulation_years + config.retirement_years;
    let mut state = TrialState::new(&config.initial_portfolio, config.rebalance, total_years);

    for year in 1..=config.accumulation_years {
        let Some(market) = scenario.next() else { break };
        state.accumulation_year(
            &market,
            year,
            year,
            config.monthly_savings,
            config.annual_increase,
            config.target_value,
            tax,
        );
    }

    // The withdrawal phase starts from whatever the savings phase built;
    // rate-anchored strategies key off the retirement-start value.
    let mut strategy_state = strategy.initial_state(state.portfolio.total());
    for phase_year in 1..=config.retirement_years {
        let Some(market) = scenario.next() else { break };
        state.withdrawal_year(
            &market,
            config.accumulation_years + phase_year,
            phase_year,
            strategy,
            &mut strategy_state,
            tax,
        );
    }

    let goal = !state.failed;
    state.into_report(goal)
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Fan a closure out over `count` trials, checking the cancel token between
/// trials and preserving trial order.
fn fan_out<T, F>(count: u32, cancel: &CancelToken, run_one: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync,
{
    (0..count as usize)
        .into_par_iter()
        .map(|trial| {
            if cancel.is_cancelled() {
                return Err(KernelError::Cancelled);
            }
            run_one(trial)
        })
        .collect()
}

/// Run all withdrawal trials. Returns reports grouped per strategy, each
/// group in trial order; paired trials across strategies share a scenario
/// seed.
pub(crate) fn run_withdrawal_trials(
    config: &WithdrawalConfig,
    cancel: &CancelToken,
) -> Result<Vec<Vec<SimulationReport>>> {
    let strategies = config.strategies();
    let tax = TaxEngine::from_config(&config.tax_config)?;
    let seeds = trial_seeds(resolve_seed(config.seed), config.num_simulations as usize);

    info!(
        num_simulations = config.num_simulations,
        simulation_years = config.simulation_years,
        strategies = strategies.len(),
        "running withdrawal simulation"
    );

    let per_trial = fan_out(config.num_simulations, cancel, |trial| {
        let mut by_strategy = Vec::with_capacity(strategies.len());
        for &strategy in &strategies {
            let scenario = config
                .scenario_config
                .build(config.simulation_years as usize, seeds[trial])?;
            by_strategy.push(withdrawal_trial(config, strategy, scenario, &tax));
        }
        Ok(by_strategy)
    })?;

    Ok(transpose(per_trial, strategies.len()))
}

/// Run all accumulation trials, in trial order.
pub(crate) fn run_accumulation_trials(
    config: &AccumulationConfig,
    cancel: &CancelToken,
) -> Result<Vec<SimulationReport>> {
    let tax = TaxEngine::from_config(&config.tax_config)?;
    let seeds = trial_seeds(resolve_seed(config.seed), config.num_simulations as usize);

    info!(
        num_simulations = config.num_simulations,
        simulation_years = config.simulation_years,
        "running accumulation simulation"
    );

    fan_out(config.num_simulations, cancel, |trial| {
        let scenario = config
            .scenario_config
            .build(config.simulation_years as usize, seeds[trial])?;
        Ok(accumulation_trial(config, scenario, &tax))
    })
}

/// Run all combined trials. Per trial, one scenario spans both phases; the
/// accumulation ending portfolio feeds the withdrawal phase.
pub(crate) fn run_combined_trials(
    config: &CombinedConfig,
    cancel: &CancelToken,
) -> Result<Vec<Vec<SimulationReport>>> {
    let strategies = config.strategies();
    let tax = TaxEngine::from_config(&config.tax_config)?;
    let total_years = (config.accumulation_years + config.retirement_years) as usize;
    let seeds = trial_seeds(resolve_seed(config.seed), config.num_simulations as usize);

    info!(
        num_simulations = config.num_simulations,
        accumulation_years = config.accumulation_years,
        retirement_years = config.retirement_years,
        strategies = strategies.len(),
        "running combined simulation"
    );

    let per_trial = fan_out(config.num_simulations, cancel, |trial| {
        let mut by_strategy = Vec::with_capacity(strategies.len());
        for &strategy in &strategies {
            let scenario = config.scenario_config.build(total_years, seeds[trial])?;
            by_strategy.push(combined_trial(config, strategy, scenario, &tax));
        }
        Ok(by_strategy)
    })?;

    Ok(transpose(per_trial, strategies.len()))
}

/// Regroup `[trial][strategy]` into `[strategy][trial]`.
fn transpose(per_trial: Vec<Vec<SimulationReport>>, strategies: usize) -> Vec<Vec<SimulationReport>> {
    let mut by_strategy: Vec<Vec<SimulationReport>> = (0..strategies)
        .map(|_| Vec::with_capacity(per_trial.len()))
        .collect();
    for trial in per_trial {
        for (slot, report) in by_strategy.iter_mut().zip(trial) {
            slot.push(report);
        }
    }
    by_strategy
}
