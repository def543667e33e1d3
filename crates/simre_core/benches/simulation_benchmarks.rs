//! Criterion benchmarks for the simre_core kernel
//!
//! Run with: cargo bench -p simre_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use simre_core::config::{PortfolioConfig, WithdrawalConfig};
use simre_core::model::Allocation;
use simre_core::run_withdrawal;
use simre_core::scenario::ScenarioConfig;
use simre_core::strategy::StrategyConfig;
use simre_core::tax::TaxConfig;

fn monte_carlo_config(num_simulations: u32) -> WithdrawalConfig {
    WithdrawalConfig {
        initial_portfolio: PortfolioConfig {
            value: 1_000_000.0,
            allocation: Allocation::new(0.6, 0.3, 0.1),
        },
        rebalance: true,
        scenario_config: ScenarioConfig::MonteCarlo {
            mean_stock_return: 0.07,
            std_stock_return: 0.15,
            mean_bond_return: 0.03,
            std_bond_return: 0.05,
            mean_inflation: 0.025,
            std_inflation: 0.01,
            cash_return: 0.005,
        },
        strategy_config: Some(StrategyConfig::FixedSwr {
            withdrawal_rate: 0.04,
            minimum_withdrawal: 0.0,
            maximum_withdrawal: None,
        }),
        strategy_configs: None,
        tax_config: TaxConfig {
            country: "spain".into(),
            region: "state".into(),
            adjust_brackets_with_inflation: true,
        },
        simulation_years: 40,
        num_simulations,
        seed: Some(42),
    }
}

fn historical_config(num_simulations: u32) -> WithdrawalConfig {
    let mut config = monte_carlo_config(num_simulations);
    config.scenario_config = ScenarioConfig::Historical {
        country: "usa".into(),
        chunk_years: Some(5),
        shuffle: true,
        randomize_start: false,
        cash_return: 0.01,
    };
    config
}

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo_withdrawal");
    for size in [100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let config = monte_carlo_config(size);
            b.iter(|| run_withdrawal(black_box(&config)).unwrap());
        });
    }
    group.finish();
}

fn bench_historical(c: &mut Criterion) {
    let mut group = c.benchmark_group("historical_withdrawal");
    for size in [100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let config = historical_config(size);
            b.iter(|| run_withdrawal(black_box(&config)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_monte_carlo, bench_historical);
criterion_main!(benches);
