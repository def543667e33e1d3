//! Withdrawal strategies as a tagged variant with per-variant state.
//!
//! A strategy decides a *net* income target for each withdrawal year; the
//! trial runner turns that into a gross withdrawal through the tax inverse
//! solver and caps it at the portfolio value. Strategies with memory
//! (Hebeler, Cash Buffer) update their state once per year.
//!
//! Monetary parameters are stated in year-0 money and indexed by cumulative
//! inflation at evaluation time.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::error::ConfigError;
use crate::model::{Allocation, YearMarket};

/// Tagged strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy_type", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum StrategyConfig {
    /// Withdraw a fixed fraction of the initial portfolio, maintained in
    /// real terms, bounded below and above.
    FixedSwr {
        withdrawal_rate: f64,
        #[serde(default)]
        minimum_withdrawal: f64,
        #[serde(default)]
        maximum_withdrawal: Option<f64>,
    },
    /// Withdraw a fixed year-0 amount, maintained in real terms.
    ConstantDollar { withdrawal_amount: f64 },
    /// Hebeler Autopilot II: blend last year's withdrawal with an
    /// amortisation of the remaining payout horizon.
    HebelerAutopilot {
        initial_withdrawal_rate: f64,
        previous_withdrawal_weight: f64,
        payout_horizon: u32,
        #[serde(default)]
        minimum_withdrawal: f64,
    },
    /// Cut back to subsistence after invested-asset losses until a cash
    /// buffer is funded; harvest surpluses into the buffer in good years.
    CashBuffer {
        withdrawal_rate_buffer: f64,
        subsistence_withdrawal: f64,
        standard_withdrawal: f64,
        #[serde(default)]
        maximum_withdrawal: Option<f64>,
        buffer_target: f64,
    },
}

impl StrategyConfig {
    /// Human-readable label used in comparison summaries.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::FixedSwr {
                withdrawal_rate, ..
            } => format!("Fixed SWR {:.1}%", withdrawal_rate * 100.0),
            StrategyConfig::ConstantDollar { withdrawal_amount } => {
                format!("Constant Dollar {withdrawal_amount:.0}")
            }
            StrategyConfig::HebelerAutopilot {
                initial_withdrawal_rate,
                ..
            } => format!(
                "Hebeler Autopilot II {:.1}%",
                initial_withdrawal_rate * 100.0
            ),
            StrategyConfig::CashBuffer {
                standard_withdrawal,
                ..
            } => format!("Cash Buffer {standard_withdrawal:.0}"),
        }
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let check_fraction = |name: &str, v: f64| -> Result<(), ConfigError> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::new(
                    format!("{field}.{name}"),
                    format!("must be a fraction in [0, 1], got {v}"),
                ));
            }
            Ok(())
        };
        let check_amount = |name: &str, v: f64| -> Result<(), ConfigError> {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::new(
                    format!("{field}.{name}"),
                    format!("must be a finite amount >= 0, got {v}"),
                ));
            }
            Ok(())
        };

        match self {
            StrategyConfig::FixedSwr {
                withdrawal_rate,
                minimum_withdrawal,
                maximum_withdrawal,
            } => {
                check_fraction("withdrawal_rate", *withdrawal_rate)?;
                check_amount("minimum_withdrawal", *minimum_withdrawal)?;
                if let Some(max) = maximum_withdrawal {
                    check_amount("maximum_withdrawal", *max)?;
                    if max < minimum_withdrawal {
                        return Err(ConfigError::new(
                            format!("{field}.maximum_withdrawal"),
                            "must be at least minimum_withdrawal",
                        ));
                    }
                }
                Ok(())
            }
            StrategyConfig::ConstantDollar { withdrawal_amount } => {
                check_amount("withdrawal_amount", *withdrawal_amount)
            }
            StrategyConfig::HebelerAutopilot {
                initial_withdrawal_rate,
                previous_withdrawal_weight,
                payout_horizon,
                minimum_withdrawal,
            } => {
                check_fraction("initial_withdrawal_rate", *initial_withdrawal_rate)?;
                check_fraction("previous_withdrawal_weight", *previous_withdrawal_weight)?;
                check_amount("minimum_withdrawal", *minimum_withdrawal)?;
                if *payout_horizon == 0 {
                    return Err(ConfigError::new(
                        format!("{field}.payout_horizon"),
                        "must be at least 1 year",
                    ));
                }
                Ok(())
            }
            StrategyConfig::CashBuffer {
                withdrawal_rate_buffer,
                subsistence_withdrawal,
                standard_withdrawal,
                maximum_withdrawal,
                buffer_target,
            } => {
                if !withdrawal_rate_buffer.is_finite() {
                    return Err(ConfigError::new(
                        format!("{field}.withdrawal_rate_buffer"),
                        "must be finite",
                    ));
                }
                check_amount("subsistence_withdrawal", *subsistence_withdrawal)?;
                check_amount("standard_withdrawal", *standard_withdrawal)?;
                check_amount("buffer_target", *buffer_target)?;
                if let Some(max) = maximum_withdrawal {
                    check_amount("maximum_withdrawal", *max)?;
                    if max < standard_withdrawal {
                        return Err(ConfigError::new(
                            format!("{field}.maximum_withdrawal"),
                            "must be at least standard_withdrawal",
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    /// Fresh per-trial state. `initial_value` is the portfolio value at
    /// trial start (or at retirement start in combined mode).
    pub fn initial_state(&self, initial_value: f64) -> StrategyState {
        match self {
            StrategyConfig::FixedSwr { .. } => StrategyState::FixedSwr { initial_value },
            StrategyConfig::ConstantDollar { .. } => StrategyState::ConstantDollar,
            StrategyConfig::HebelerAutopilot { .. } => StrategyState::Hebeler {
                previous_withdrawal: None,
            },
            StrategyConfig::CashBuffer { .. } => StrategyState::CashBuffer {
                buffer: 0.0,
                previous: None,
            },
        }
    }
}

/// Returns observed in the previous year, remembered by the Cash Buffer
/// strategy to classify the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedReturns {
    pub combined: f64,
    pub non_cash: f64,
}

/// Per-trial mutable state, one variant per strategy kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyState {
    FixedSwr { initial_value: f64 },
    ConstantDollar,
    Hebeler { previous_withdrawal: Option<f64> },
    CashBuffer {
        buffer: f64,
        previous: Option<ObservedReturns>,
    },
}

/// Everything a strategy may look at when deciding the year's target.
#[derive(Debug, Clone, Copy)]
pub struct YearContext<'a> {
    /// 1-based withdrawal year.
    pub year: u32,
    pub market: &'a YearMarket,
    /// Start-of-year allocation, before this year's returns.
    pub allocation: Allocation,
    /// Portfolio value before this year's returns.
    pub start_value: f64,
    /// Portfolio value after returns, before the withdrawal.
    pub value: f64,
    /// Cumulative inflation through this year.
    pub cumulative_inflation: f64,
}

impl StrategyConfig {
    /// Net income target for this year. Updates strategy memory that depends
    /// only on the target itself (the Hebeler anchor).
    pub fn target_net(&self, state: &mut StrategyState, ctx: &YearContext<'_>) -> f64 {
        let infl = ctx.cumulative_inflation;
        match (self, state) {
            (
                StrategyConfig::FixedSwr {
                    withdrawal_rate,
                    minimum_withdrawal,
                    maximum_withdrawal,
                },
                StrategyState::FixedSwr { initial_value },
            ) => {
                let base = withdrawal_rate * *initial_value;
                let bounded = base
                    .max(*minimum_withdrawal)
                    .min(maximum_withdrawal.unwrap_or(f64::INFINITY));
                bounded * infl
            }
            (
                StrategyConfig::ConstantDollar { withdrawal_amount },
                StrategyState::ConstantDollar,
            ) => withdrawal_amount * infl,
            (
                StrategyConfig::HebelerAutopilot {
                    initial_withdrawal_rate,
                    previous_withdrawal_weight,
                    payout_horizon,
                    minimum_withdrawal,
                },
                StrategyState::Hebeler {
                    previous_withdrawal,
                },
            ) => {
                let target = match previous_withdrawal {
                    // Year 1 anchors to the starting portfolio.
                    None => initial_withdrawal_rate * ctx.start_value,
                    Some(p) => {
                        let remaining =
                            (*payout_horizon as i64 - ctx.year as i64 + 1).max(1) as f64;
                        previous_withdrawal_weight * *p
                            + (1.0 - previous_withdrawal_weight) * (ctx.start_value / remaining)
                    }
                };
                let clamped = target.max(minimum_withdrawal * infl);
                *previous_withdrawal = Some(clamped);
                clamped
            }
            (
                StrategyConfig::CashBuffer {
                    withdrawal_rate_buffer,
                    subsistence_withdrawal,
                    standard_withdrawal,
                    maximum_withdrawal,
                    buffer_target,
                },
                StrategyState::CashBuffer { buffer, previous },
            ) => {
                match cash_buffer_branch(
                    *withdrawal_rate_buffer,
                    *buffer_target,
                    *buffer,
                    *previous,
                    ctx.market.cash_return,
                ) {
                    CashBufferBranch::Subsistence => subsistence_withdrawal * infl,
                    CashBufferBranch::Harvest => {
                        let room = (buffer_target - *buffer).max(0.0);
                        let target = standard_withdrawal * infl + room;
                        match maximum_withdrawal {
                            Some(max) => target.min(max * infl),
                            None => target,
                        }
                    }
                    CashBufferBranch::Standard => standard_withdrawal * infl,
                }
            }
            _ => unreachable!("strategy state does not match config variant"),
        }
    }

    /// Feed back the net income actually achieved (post tax solve, post
    /// portfolio cap) and the year's market so memoryful strategies can
    /// update.
    pub fn record_outcome(
        &self,
        state: &mut StrategyState,
        ctx: &YearContext<'_>,
        net_achieved: f64,
    ) {
        if let (
            StrategyConfig::CashBuffer {
                withdrawal_rate_buffer,
                standard_withdrawal,
                buffer_target,
                ..
            },
            StrategyState::CashBuffer { buffer, previous },
        ) = (self, state)
        {
            let branch = cash_buffer_branch(
                *withdrawal_rate_buffer,
                *buffer_target,
                *buffer,
                *previous,
                ctx.market.cash_return,
            );
            if branch == CashBufferBranch::Harvest {
                let surplus = net_achieved - standard_withdrawal * ctx.cumulative_inflation;
                let deposit = surplus.clamp(0.0, (*buffer_target - *buffer).max(0.0));
                *buffer += deposit;
            }
            *previous = Some(ObservedReturns {
                combined: ctx.market.combined_return(&ctx.allocation),
                non_cash: ctx.market.non_cash_return(&ctx.allocation),
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CashBufferBranch {
    Subsistence,
    Harvest,
    Standard,
}

/// The year classification is driven by last year's realised returns; the
/// first year has no history and withdraws the standard amount.
fn cash_buffer_branch(
    rate_buffer: f64,
    buffer_target: f64,
    buffer: f64,
    previous: Option<ObservedReturns>,
    reference_rate: f64,
) -> CashBufferBranch {
    match previous {
        Some(observed) => {
            if observed.non_cash < 0.0 && buffer < buffer_target {
                CashBufferBranch::Subsistence
            } else if observed.combined >= rate_buffer + reference_rate {
                CashBufferBranch::Harvest
            } else {
                CashBufferBranch::Standard
            }
        }
        None => CashBufferBranch::Standard,
    }
}

/// Accumulation-phase contribution for a 1-based year: twelve monthly
/// payments grown by the annual increase.
pub fn contribution(monthly_savings: f64, annual_increase: f64, year: u32) -> f64 {
    12.0 * monthly_savings * (1.0 + annual_increase).powi(year as i32 - 1)
}
