//! Progressive tax evaluation and its closed-form inverse.
//!
//! Capital-gains tax applies to the year's gross withdrawal, wealth tax to
//! the end-of-year portfolio value. Both use bracket schedules whose
//! thresholds are lower bounds; with `adjust_brackets_with_inflation` the
//! thresholds (and the wealth allowance) are scaled by cumulative inflation
//! through the previous year, so this year's brackets use last year's price
//! level.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::data::{TaxBracket, TaxSchedule, tax_schedule};
use crate::error::Result;

/// Region selection for the tax engine. `country == "none"` selects the
/// zero-tax engine and ignores `region`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct TaxConfig {
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub adjust_brackets_with_inflation: bool,
}

impl TaxConfig {
    pub fn is_none(&self) -> bool {
        self.country.eq_ignore_ascii_case("none")
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_none() {
            return Ok(());
        }
        tax_schedule(&self.country, &self.region).map(|_| ())
    }
}

/// Taxes assessed for one year.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TaxAssessment {
    pub gross_income: f64,
    pub net_income: f64,
    pub capital_gains_tax: f64,
    pub wealth_tax: f64,
}

/// Resolved tax engine, shared read-only across all trials of a run.
#[derive(Debug, Clone, Copy)]
pub enum TaxEngine {
    /// Zero tax everywhere; net always equals gross.
    None,
    Regional {
        schedule: &'static TaxSchedule,
        adjust_brackets: bool,
    },
}

impl TaxEngine {
    pub fn from_config(config: &TaxConfig) -> Result<Self> {
        if config.is_none() {
            return Ok(TaxEngine::None);
        }
        Ok(TaxEngine::Regional {
            schedule: tax_schedule(&config.country, &config.region)?,
            adjust_brackets: config.adjust_brackets_with_inflation,
        })
    }

    fn bracket_scale(&self, cumulative_inflation: f64) -> f64 {
        match self {
            TaxEngine::None => 1.0,
            TaxEngine::Regional {
                adjust_brackets, ..
            } => {
                if *adjust_brackets && cumulative_inflation > 0.0 {
                    cumulative_inflation
                } else {
                    1.0
                }
            }
        }
    }

    /// Assess the year's taxes. `cumulative_inflation` is the price level of
    /// the previous year relative to the base year.
    pub fn assess(&self, gross_income: f64, wealth: f64, cumulative_inflation: f64) -> TaxAssessment {
        match self {
            TaxEngine::None => TaxAssessment {
                gross_income,
                net_income: gross_income,
                capital_gains_tax: 0.0,
                wealth_tax: 0.0,
            },
            TaxEngine::Regional { schedule, .. } => {
                let scale = self.bracket_scale(cumulative_inflation);
                let capital_gains_tax =
                    progressive_tax(gross_income, &schedule.income_brackets, scale);
                let wealth_tax = self.wealth_tax(wealth, cumulative_inflation);
                TaxAssessment {
                    gross_income,
                    net_income: gross_income - capital_gains_tax - wealth_tax,
                    capital_gains_tax,
                    wealth_tax,
                }
            }
        }
    }

    /// Wealth tax alone, used in accumulation years where no withdrawals
    /// happen and nothing is realised.
    pub fn wealth_tax(&self, wealth: f64, cumulative_inflation: f64) -> f64 {
        match self {
            TaxEngine::None => 0.0,
            TaxEngine::Regional { schedule, .. } => {
                let scale = self.bracket_scale(cumulative_inflation);
                let taxable = (wealth - schedule.wealth_allowance * scale).max(0.0);
                progressive_tax(taxable, &schedule.wealth_brackets, scale)
            }
        }
    }

    /// Solve `gross - income_tax(gross) - wealth_tax(wealth) = net` for the
    /// gross withdrawal. The schedule is piecewise linear and monotonic in
    /// the gross, so the containing bracket is found by evaluating net at
    /// each threshold and interpolating; no iteration. When no gross within
    /// the available wealth reaches the requested net, the maximum feasible
    /// gross (the wealth itself) is returned and the caller handles the
    /// shortfall.
    pub fn gross_for_net(&self, net: f64, wealth: f64, cumulative_inflation: f64) -> f64 {
        if net <= 0.0 {
            return 0.0;
        }
        let wealth = wealth.max(0.0);
        match self {
            TaxEngine::None => net.min(wealth),
            TaxEngine::Regional { schedule, .. } => {
                let scale = self.bracket_scale(cumulative_inflation);
                let target = net + self.wealth_tax(wealth, cumulative_inflation);
                let gross = gross_for_income_net(target, &schedule.income_brackets, scale);
                gross.min(wealth)
            }
        }
    }
}

/// Σ over brackets of rate × the slice of `amount` inside the bracket.
/// Thresholds are scaled by `scale` before use.
fn progressive_tax(amount: f64, brackets: &[TaxBracket], scale: f64) -> f64 {
    if amount <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut tax = 0.0;
    for (i, bracket) in brackets.iter().enumerate() {
        let lower = bracket.threshold * scale;
        if amount <= lower {
            break;
        }
        let upper = brackets
            .get(i + 1)
            .map(|b| b.threshold * scale)
            .unwrap_or(f64::INFINITY);
        tax += (amount.min(upper) - lower) * bracket.rate;
    }
    tax
}

/// Invert `g - progressive_tax(g)` for a target net by walking the linear
/// segments. Returns infinity when a segment with rate >= 1 blocks further
/// net income before the target is reached.
fn gross_for_income_net(target: f64, brackets: &[TaxBracket], scale: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    if brackets.is_empty() {
        return target;
    }

    let mut gross = 0.0;
    let mut net = 0.0;

    // Implicit zero-rate segment below the first threshold.
    let first_lower = brackets[0].threshold * scale;
    if first_lower > 0.0 {
        if target <= first_lower {
            return target;
        }
        gross = first_lower;
        net = first_lower;
    }

    for (i, bracket) in brackets.iter().enumerate() {
        let keep = 1.0 - bracket.rate;
        let upper = brackets
            .get(i + 1)
            .map(|b| b.threshold * scale)
            .unwrap_or(f64::INFINITY);

        if keep <= 0.0 {
            // Confiscatory segment: net cannot grow past this point.
            return f64::INFINITY;
        }

        let segment_net = (upper - gross) * keep;
        if net + segment_net >= target {
            return gross + (target - net) / keep;
        }
        net += segment_net;
        gross = upper;
    }

    // Unreachable: the last segment extends to infinity.
    f64::INFINITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_bracket_schedule() -> TaxSchedule {
        TaxSchedule {
            base_year: 2020,
            income_brackets: vec![TaxBracket {
                threshold: 20_000.0,
                rate: 0.2,
            }],
            wealth_brackets: vec![],
            wealth_allowance: 0.0,
        }
    }

    fn engine_for(schedule: &'static TaxSchedule, adjust: bool) -> TaxEngine {
        TaxEngine::Regional {
            schedule,
            adjust_brackets: adjust,
        }
    }

    fn leak(schedule: TaxSchedule) -> &'static TaxSchedule {
        Box::leak(Box::new(schedule))
    }

    #[test]
    fn progressive_tax_spans_brackets() {
        let brackets = vec![
            TaxBracket {
                threshold: 0.0,
                rate: 0.10,
            },
            TaxBracket {
                threshold: 10_000.0,
                rate: 0.12,
            },
            TaxBracket {
                threshold: 40_000.0,
                rate: 0.22,
            },
        ];
        // 10,000 @ 10% + 30,000 @ 12% + 10,000 @ 22% = 6,800
        let tax = progressive_tax(50_000.0, &brackets, 1.0);
        assert!((tax - 6_800.0).abs() < 1e-9);
    }

    #[test]
    fn inflation_indexing_uses_previous_year_price_level() {
        // Single bracket at 20,000 / 20%; 10% inflation per year.
        let engine = engine_for(leak(single_bracket_schedule()), true);

        // Year 3: thresholds scaled by 1.1^2 = 1.21 -> 24,200.
        let cumulative = 1.1f64.powi(2);
        let assessed = engine.assess(25_000.0, 0.0, cumulative);
        assert!((assessed.capital_gains_tax - 160.0).abs() < 1e-9);

        // Without indexing the same gross pays on 5,000.
        let flat = engine_for(leak(single_bracket_schedule()), false);
        let assessed = flat.assess(25_000.0, 0.0, cumulative);
        assert!((assessed.capital_gains_tax - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_solver_interpolates_within_the_bracket() {
        // Income bracket {20,000, 20%} plus wealth bracket {0, 1%}.
        let schedule = leak(TaxSchedule {
            base_year: 2020,
            income_brackets: vec![TaxBracket {
                threshold: 20_000.0,
                rate: 0.2,
            }],
            wealth_brackets: vec![TaxBracket {
                threshold: 0.0,
                rate: 0.01,
            }],
            wealth_allowance: 0.0,
        });
        let engine = engine_for(schedule, false);

        // Wealth tax on 100,000 = 1,000; solve G - incomeTax(G) = 21,000.
        let gross = engine.gross_for_net(20_000.0, 100_000.0, 1.0);
        assert!((gross - 21_250.0).abs() < 1e-9);

        // The assessment closes the loop.
        let assessed = engine.assess(gross, 100_000.0, 1.0);
        assert!((assessed.net_income - 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_solver_clamps_to_available_wealth() {
        let engine = engine_for(leak(single_bracket_schedule()), false);
        let gross = engine.gross_for_net(50_000.0, 30_000.0, 1.0);
        assert!((gross - 30_000.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_net_requests_no_gross() {
        let engine = engine_for(leak(single_bracket_schedule()), false);
        assert_eq!(engine.gross_for_net(0.0, 100_000.0, 1.0), 0.0);
        assert_eq!(engine.gross_for_net(-5.0, 100_000.0, 1.0), 0.0);
    }

    #[test]
    fn tax_is_monotonic_and_marginal_rate_matches_bracket() {
        let engine = TaxEngine::from_config(&TaxConfig {
            country: "spain".into(),
            region: "state".into(),
            adjust_brackets_with_inflation: false,
        })
        .unwrap();

        let mut previous = 0.0;
        for step in 0..200 {
            let gross = step as f64 * 2_500.0;
            let tax = engine.assess(gross, 0.0, 1.0).capital_gains_tax;
            assert!(tax + 1e-9 >= previous, "tax decreased at gross {gross}");
            previous = tax;
        }

        // Marginal rate inside the 21% band (6,000..50,000).
        let lo = engine.assess(20_000.0, 0.0, 1.0).capital_gains_tax;
        let hi = engine.assess(20_001.0, 0.0, 1.0).capital_gains_tax;
        assert!((hi - lo - 0.21).abs() < 1e-9);
    }

    #[test]
    fn inverse_round_trips_through_forward() {
        let engine = TaxEngine::from_config(&TaxConfig {
            country: "spain".into(),
            region: "catalonia".into(),
            adjust_brackets_with_inflation: false,
        })
        .unwrap();

        let wealth = 1_500_000.0;
        for gross in [100.0, 5_000.0, 25_000.0, 60_000.0, 250_000.0, 400_000.0] {
            let net = engine.assess(gross, wealth, 1.0).net_income;
            if net <= 0.0 {
                continue;
            }
            let recovered = engine.gross_for_net(net, wealth, 1.0);
            assert!(
                (recovered - gross).abs() < 1e-6,
                "round trip failed for gross {gross}: {recovered}"
            );
        }
    }

    #[test]
    fn wealth_allowance_shields_small_estates() {
        let engine = TaxEngine::from_config(&TaxConfig {
            country: "spain".into(),
            region: "state".into(),
            adjust_brackets_with_inflation: false,
        })
        .unwrap();
        assert_eq!(engine.wealth_tax(500_000.0, 1.0), 0.0);
        assert!(engine.wealth_tax(1_000_000.0, 1.0) > 0.0);
    }

    #[test]
    fn none_engine_is_transparent() {
        let engine = TaxEngine::from_config(&TaxConfig {
            country: "none".into(),
            region: String::new(),
            adjust_brackets_with_inflation: false,
        })
        .unwrap();
        let assessed = engine.assess(42_000.0, 900_000.0, 2.5);
        assert_eq!(assessed.net_income, 42_000.0);
        assert_eq!(assessed.capital_gains_tax, 0.0);
        assert_eq!(assessed.wealth_tax, 0.0);
        assert_eq!(engine.gross_for_net(10_000.0, 50_000.0, 1.0), 10_000.0);
    }
}
