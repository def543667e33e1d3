use crate::api::run_withdrawal;
use crate::strategy::StrategyConfig;

use super::common::*;

/// Paired sampling: every trial sees the same market sequence under every
/// strategy, so outcome differences come from cash-flow decisions alone.
#[test]
fn compared_strategies_see_identical_scenarios() {
    let mut config = withdrawal_config(
        all_stocks(1_000_000.0),
        noisy_scenario(),
        fixed_swr(0.04),
        30,
        100,
        42,
    );
    config.strategy_config = None;
    config.strategy_configs = Some(vec![
        fixed_swr(0.04),
        StrategyConfig::ConstantDollar {
            withdrawal_amount: 40_000.0,
        },
    ]);

    let result = run_withdrawal(&config).unwrap();
    assert_eq!(result.runs.len(), 2);
    assert_eq!(result.runs[0].reports.len(), 100);
    assert_eq!(result.runs[1].reports.len(), 100);

    for (a, b) in result.runs[0].reports.iter().zip(&result.runs[1].reports) {
        for (ra, rb) in a.yearly_records.iter().zip(&b.yearly_records) {
            assert_eq!(ra.stock_return, rb.stock_return);
            assert_eq!(ra.bond_return, rb.bond_return);
            assert_eq!(ra.cash_return, rb.cash_return);
            assert_eq!(ra.inflation, rb.inflation);
        }
    }

    let summaries = result
        .summary
        .strategy_summaries
        .as_ref()
        .expect("compare mode produces a summary table");
    assert_eq!(summaries.len(), 2);
    for summary in summaries {
        assert_eq!(summary.num_simulations, 100);
        assert!((0.0..=1.0).contains(&summary.success_rate));
    }
}

/// A comparison containing a single strategy reproduces the standalone run
/// trial for trial.
#[test]
fn singleton_comparison_matches_standalone_run() {
    let standalone = withdrawal_config(
        all_stocks(750_000.0),
        noisy_scenario(),
        fixed_swr(0.045),
        25,
        50,
        9,
    );

    let mut comparison = standalone.clone();
    comparison.strategy_config = None;
    comparison.strategy_configs = Some(vec![fixed_swr(0.045)]);

    let single = run_withdrawal(&standalone).unwrap();
    let compared = run_withdrawal(&comparison).unwrap();

    assert_eq!(compared.runs.len(), 1);
    assert_eq!(single.runs[0].reports, compared.runs[0].reports);
    // No summary table for a single entry.
    assert!(compared.summary.strategy_summaries.is_none());
}

/// All four strategy kinds run side by side on paired scenarios.
#[test]
fn four_way_comparison_runs_all_variants() {
    let mut config = withdrawal_config(
        all_stocks(1_200_000.0),
        noisy_scenario(),
        fixed_swr(0.04),
        30,
        40,
        17,
    );
    config.strategy_config = None;
    config.strategy_configs = Some(vec![
        fixed_swr(0.04),
        StrategyConfig::ConstantDollar {
            withdrawal_amount: 45_000.0,
        },
        StrategyConfig::HebelerAutopilot {
            initial_withdrawal_rate: 0.04,
            previous_withdrawal_weight: 0.5,
            payout_horizon: 30,
            minimum_withdrawal: 20_000.0,
        },
        StrategyConfig::CashBuffer {
            withdrawal_rate_buffer: 0.05,
            subsistence_withdrawal: 25_000.0,
            standard_withdrawal: 45_000.0,
            maximum_withdrawal: Some(90_000.0),
            buffer_target: 90_000.0,
        },
    ]);

    let result = run_withdrawal(&config).unwrap();
    assert_eq!(result.runs.len(), 4);
    let labels: Vec<&str> = result.runs.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels[0], "Fixed SWR 4.0%");
    assert!(labels[2].starts_with("Hebeler"));

    for run in &result.runs {
        assert_eq!(run.reports.len(), 40);
        for report in &run.reports {
            assert_eq!(report.yearly_records.len(), 30);
        }
    }
}
