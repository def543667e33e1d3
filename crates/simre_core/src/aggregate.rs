//! Statistical aggregation of per-trial reports: percentile bands,
//! histograms, success rates, and failure-year distributions.
//!
//! Quantiles use the nearest-rank convention on sorted arrays:
//! `idx = max(0, ceil(n * p) - 1)`. Post-depletion years stay in the
//! per-year statistics as zero-valued records, so bands and histograms
//! cover the same year axis for every trial.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::model::SimulationReport;

/// Final-portfolio histograms: 250k-wide bins up to 10M plus an overflow
/// bin.
pub const PORTFOLIO_BIN_WIDTH: f64 = 250_000.0;
pub const PORTFOLIO_BIN_LIMIT: f64 = 10_000_000.0;

/// Income histograms: 5k-wide bins up to 100k plus an overflow bin.
pub const INCOME_BIN_WIDTH: f64 = 5_000.0;
pub const INCOME_BIN_LIMIT: f64 = 100_000.0;

/// Nearest-rank quantile of a sorted slice.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() as f64 * p).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// The five standard percentiles of one year's cross-trial distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct QuantileBand {
    pub p10: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
}

impl QuantileBand {
    fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p10: nearest_rank(sorted, 0.10),
            p25: nearest_rank(sorted, 0.25),
            median: nearest_rank(sorted, 0.50),
            p75: nearest_rank(sorted, 0.75),
            p90: nearest_rank(sorted, 0.90),
        }
    }
}

/// Per-year percentile bands, nominal and real, for portfolio value and net
/// income. All vectors have one entry per simulation year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct YearlyBands {
    pub portfolio_value: Vec<QuantileBand>,
    pub income: Vec<QuantileBand>,
    pub real_portfolio_value: Vec<QuantileBand>,
    pub real_income: Vec<QuantileBand>,
}

/// Fixed-width histogram with a single overflow bin above `limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Histogram {
    pub bin_width: f64,
    pub limit: f64,
    /// `counts[i]` covers `[i * bin_width, (i + 1) * bin_width)`.
    pub counts: Vec<u64>,
    pub overflow: u64,
}

impl Histogram {
    pub fn new(bin_width: f64, limit: f64) -> Self {
        let bins = (limit / bin_width).ceil() as usize;
        Self {
            bin_width,
            limit,
            counts: vec![0; bins],
            overflow: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let value = value.max(0.0);
        if value >= self.limit {
            self.overflow += 1;
        } else {
            let bin = (value / self.bin_width) as usize;
            let idx = bin.min(self.counts.len() - 1);
            self.counts[idx] += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.overflow
    }
}

/// Everything the aggregator derives from one group of per-trial reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Aggregate {
    /// Fraction of trials with `goal_achieved`.
    pub success_rate: f64,
    pub bands: YearlyBands,
    pub final_portfolio_histogram: Histogram,
    /// Net income of every trial year (post-depletion zeros included).
    pub income_histogram: Histogram,
    /// `failure_year_counts[y]` counts trials first depleted in year `y+1`.
    pub failure_year_counts: Vec<u64>,
    /// Median first year the accumulation target was reached, over the
    /// trials that reached it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_time_to_target: Option<f64>,
}

/// Aggregate one strategy's reports. `simulation_years` fixes the year axis
/// so bands line up even if a report list were ragged.
pub fn aggregate(reports: &[SimulationReport], simulation_years: u32) -> Aggregate {
    let years = simulation_years as usize;

    let success_count = reports.iter().filter(|r| r.goal_achieved).count();
    let success_rate = if reports.is_empty() {
        0.0
    } else {
        success_count as f64 / reports.len() as f64
    };

    let band_of = |select: &dyn Fn(&crate::model::YearRecord) -> f64| -> Vec<QuantileBand> {
        (0..years)
            .map(|y| {
                let mut values: Vec<f64> = reports
                    .iter()
                    .filter_map(|r| r.yearly_records.get(y))
                    .map(select)
                    .collect();
                values.sort_unstable_by(f64::total_cmp);
                QuantileBand::from_sorted(&values)
            })
            .collect()
    };

    let bands = YearlyBands {
        portfolio_value: band_of(&|r| r.portfolio_value),
        income: band_of(&|r| r.net_income),
        real_portfolio_value: band_of(&|r| r.real_portfolio_value),
        real_income: band_of(&|r| r.real_net_income),
    };

    let mut final_portfolio_histogram = Histogram::new(PORTFOLIO_BIN_WIDTH, PORTFOLIO_BIN_LIMIT);
    for report in reports {
        final_portfolio_histogram.add(report.final_portfolio_value);
    }

    let mut income_histogram = Histogram::new(INCOME_BIN_WIDTH, INCOME_BIN_LIMIT);
    for record in reports.iter().flat_map(|r| &r.yearly_records) {
        income_histogram.add(record.net_income);
    }

    let mut failure_year_counts = vec![0u64; years];
    for report in reports {
        if let Some(year) = report.failure_year() {
            let idx = (year as usize).saturating_sub(1);
            if idx < failure_year_counts.len() {
                failure_year_counts[idx] += 1;
            }
        }
    }

    let mut times: Vec<f64> = reports
        .iter()
        .filter_map(|r| r.time_to_target)
        .map(f64::from)
        .collect();
    times.sort_unstable_by(f64::total_cmp);
    let median_time_to_target = if times.is_empty() {
        None
    } else {
        Some(nearest_rank(&times, 0.5))
    };

    Aggregate {
        success_rate,
        bands,
        final_portfolio_histogram,
        income_histogram,
        failure_year_counts,
        median_time_to_target,
    }
}
