//! Plain-text and CSV renderings of simulation results.

use std::fmt::Write as _;

use simre_core::aggregate::Aggregate;
use simre_core::model::SimulationReport;
use simre_core::{AccumulationResult, CombinedResult, Summary, WithdrawalResult};

const RULE: &str = "========================================================================";

fn summary_block(out: &mut String, title: &str, summary: &Summary) {
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Simulations     : {}", summary.num_simulations);
    let _ = writeln!(out, "Years           : {}", summary.simulation_years);
    let _ = writeln!(
        out,
        "Success rate    : {:.1}%",
        summary.success_rate * 100.0
    );
    if let Some(median) = summary.median_time_to_target {
        let _ = writeln!(out, "Median to target: {median:.0} years");
    }
    if let Some(rows) = &summary.strategy_summaries {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<32}  {:>12}  {:>12}", "Strategy", "Trials", "Success");
        for row in rows {
            let _ = writeln!(
                out,
                "{:<32}  {:>12}  {:>11.1}%",
                row.label,
                row.num_simulations,
                row.success_rate * 100.0
            );
        }
    }
    let _ = writeln!(out);
}

fn bands_table(out: &mut String, aggregate: &Aggregate) {
    let _ = writeln!(
        out,
        "{:>5}  {:>14}  {:>14}  {:>14}  {:>12}",
        "Year", "P10", "Median", "P90", "Income P50"
    );
    for (i, band) in aggregate.bands.portfolio_value.iter().enumerate() {
        let income = &aggregate.bands.income[i];
        let _ = writeln!(
            out,
            "{:>5}  {:>14.2}  {:>14.2}  {:>14.2}  {:>12.2}",
            i + 1,
            band.p10,
            band.median,
            band.p90,
            income.median
        );
    }
    let _ = writeln!(out);
}

fn single_trial_table(out: &mut String, report: &SimulationReport) {
    let header = format!(
        "{:>5}  {:>14}  {:>12}  {:>12}  {:>12}  {:>9}  {:>14}",
        "Year", "Portfolio", "Gross Inc", "Net Inc", "Tax", "Inflation", "Real Port"
    );
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.len()));
    for r in &report.yearly_records {
        let _ = writeln!(
            out,
            "{:>5}  {:>14.2}  {:>12.2}  {:>12.2}  {:>12.2}  {:>8.2}%  {:>14.2}",
            r.year,
            r.portfolio_value,
            r.gross_income,
            r.net_income,
            r.total_tax(),
            r.inflation * 100.0,
            r.real_portfolio_value
        );
    }
    let _ = writeln!(out, "{RULE}");
}

pub fn withdrawal_txt(result: &WithdrawalResult) -> String {
    let mut out = String::new();
    summary_block(&mut out, "WITHDRAWAL SIMULATION REPORT", &result.summary);
    for run in &result.runs {
        let _ = writeln!(
            out,
            "--- {} ({:.1}% success) ---",
            run.label,
            run.aggregate.success_rate * 100.0
        );
        if result.summary.num_simulations == 1 {
            single_trial_table(&mut out, &run.reports[0]);
        } else {
            bands_table(&mut out, &run.aggregate);
        }
    }
    out
}

pub fn accumulation_txt(result: &AccumulationResult) -> String {
    let mut out = String::new();
    summary_block(&mut out, "ACCUMULATION SIMULATION REPORT", &result.summary);
    if result.summary.num_simulations == 1 {
        single_trial_table(&mut out, &result.reports[0]);
    } else {
        bands_table(&mut out, &result.aggregate);
    }
    out
}

pub fn combined_txt(result: &CombinedResult) -> String {
    let mut out = String::new();
    summary_block(&mut out, "COMBINED SIMULATION REPORT", &result.summary);
    let _ = writeln!(
        out,
        "Phases          : {} saving + {} retirement years",
        result.accumulation_years, result.retirement_years
    );
    let _ = writeln!(out);
    for run in &result.runs {
        let _ = writeln!(
            out,
            "--- {} ({:.1}% success) ---",
            run.label,
            run.aggregate.success_rate * 100.0
        );
        if result.summary.num_simulations == 1 {
            single_trial_table(&mut out, &run.reports[0]);
        } else {
            bands_table(&mut out, &run.aggregate);
        }
    }
    out
}

const CSV_HEADER: &str = "strategy,trial,year,portfolio_value,gross_income,net_income,\
capital_gains_tax,wealth_tax,contribution,inflation_rate,real_portfolio_value,\
real_gross_income,real_net_income";

fn csv_rows(out: &mut String, strategy: &str, reports: &[SimulationReport]) {
    for (trial, report) in reports.iter().enumerate() {
        for r in &report.yearly_records {
            let _ = writeln!(
                out,
                "{strategy},{trial},{},{},{},{},{},{},{},{},{},{},{}",
                r.year,
                r.portfolio_value,
                r.gross_income,
                r.net_income,
                r.capital_gains_tax,
                r.wealth_tax,
                r.contribution,
                r.inflation,
                r.real_portfolio_value,
                r.real_gross_income,
                r.real_net_income
            );
        }
    }
}

pub fn withdrawal_csv(result: &WithdrawalResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{CSV_HEADER}");
    for run in &result.runs {
        csv_rows(&mut out, &run.label, &run.reports);
    }
    out
}

pub fn accumulation_csv(result: &AccumulationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{CSV_HEADER}");
    csv_rows(&mut out, "accumulation", &result.reports);
    out
}

pub fn combined_csv(result: &CombinedResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{CSV_HEADER}");
    for run in &result.runs {
        csv_rows(&mut out, &run.label, &run.reports);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use simre_core::config::{PortfolioConfig, WithdrawalConfig};
    use simre_core::model::Allocation;
    use simre_core::run_withdrawal;
    use simre_core::scenario::ScenarioConfig;
    use simre_core::strategy::StrategyConfig;
    use simre_core::tax::TaxConfig;

    fn small_result() -> WithdrawalResult {
        let config = WithdrawalConfig {
            initial_portfolio: PortfolioConfig {
                value: 500_000.0,
                allocation: Allocation::new(1.0, 0.0, 0.0),
            },
            rebalance: false,
            scenario_config: ScenarioConfig::MonteCarlo {
                mean_stock_return: 0.0,
                std_stock_return: 0.0,
                mean_bond_return: 0.0,
                std_bond_return: 0.0,
                mean_inflation: 0.0,
                std_inflation: 0.0,
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
            simulation_years: 3,
            num_simulations: 1,
            seed: Some(0),
        };
        run_withdrawal(&config).unwrap()
    }

    #[test]
    fn txt_report_contains_summary_and_years() {
        let text = withdrawal_txt(&small_result());
        assert!(text.contains("WITHDRAWAL SIMULATION REPORT"));
        assert!(text.contains("Success rate"));
        assert!(text.contains("Fixed SWR 4.0%"));
    }

    #[test]
    fn csv_report_has_one_row_per_year() {
        let csv = withdrawal_csv(&small_result());
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        // Header plus 3 years.
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("strategy,trial,year"));
    }
}
