//! Scenario generation: per-trial lazy sequences of market years.
//!
//! Two variants share one config union. Historical scenarios resample a
//! country's bundled return history with a block bootstrap; Monte Carlo
//! scenarios draw each year independently from normal distributions. Either
//! way a scenario is a finite iterator of exactly the requested length,
//! owned by a single trial and seeded so that (seed, config) fully determine
//! the sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::data::{HistoricalSeries, historical_series};
use crate::error::{ConfigError, Result};
use crate::model::YearMarket;

/// Sampled returns are clipped here so one year can never wipe more than a
/// whole sleeve (a normal draw has no lower bound).
const MIN_RETURN: f64 = -0.999;

fn default_true() -> bool {
    true
}

fn default_mean_stock() -> f64 {
    0.07
}
fn default_std_stock() -> f64 {
    0.15
}
fn default_mean_bond() -> f64 {
    0.03
}
fn default_std_bond() -> f64 {
    0.05
}
fn default_mean_inflation() -> f64 {
    0.025
}
fn default_std_inflation() -> f64 {
    0.01
}

/// Tagged scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario_type", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum ScenarioConfig {
    /// Resample a country's historical record.
    ///
    /// `chunk_years` of `None` or 1 samples single years (classic i.i.d.
    /// bootstrap when shuffled); `n >= 2` keeps n-year runs together so
    /// multi-year bull/bear sequences survive resampling. Block starts wrap
    /// around the end of the series.
    Historical {
        country: String,
        #[serde(default)]
        chunk_years: Option<u32>,
        #[serde(default = "default_true")]
        shuffle: bool,
        #[serde(default)]
        randomize_start: bool,
        #[serde(default)]
        cash_return: f64,
    },
    /// Independent normal draws per year for stock, bond, and inflation;
    /// arithmetic returns, no cross-asset correlation.
    MonteCarlo {
        #[serde(default = "default_mean_stock")]
        mean_stock_return: f64,
        #[serde(default = "default_std_stock")]
        std_stock_return: f64,
        #[serde(default = "default_mean_bond")]
        mean_bond_return: f64,
        #[serde(default = "default_std_bond")]
        std_bond_return: f64,
        #[serde(default = "default_mean_inflation")]
        mean_inflation: f64,
        #[serde(default = "default_std_inflation")]
        std_inflation: f64,
        #[serde(default)]
        cash_return: f64,
    },
}

impl ScenarioConfig {
    /// Validate everything that can fail before a trial starts, including
    /// the country lookup for historical configs.
    pub fn validate(&self) -> Result<()> {
        match self {
            ScenarioConfig::Historical {
                country,
                chunk_years,
                ..
            } => {
                let series = historical_series(country)?;
                if let Some(chunk) = chunk_years {
                    if *chunk == 0 {
                        return Err(ConfigError::new(
                            "scenario_config.chunk_years",
                            "must be at least 1 (or omitted for single-year sampling)",
                        )
                        .into());
                    }
                    if *chunk as usize > series.len() {
                        return Err(ConfigError::new(
                            "scenario_config.chunk_years",
                            format!(
                                "block of {chunk} years exceeds the {} available for `{country}`",
                                series.len()
                            ),
                        )
                        .into());
                    }
                }
                Ok(())
            }
            ScenarioConfig::MonteCarlo {
                std_stock_return,
                std_bond_return,
                std_inflation,
                ..
            } => {
                for (field, std) in [
                    ("scenario_config.std_stock_return", std_stock_return),
                    ("scenario_config.std_bond_return", std_bond_return),
                    ("scenario_config.std_inflation", std_inflation),
                ] {
                    if !std.is_finite() || *std < 0.0 {
                        return Err(ConfigError::new(
                            field,
                            format!("standard deviation must be finite and >= 0, got {std}"),
                        )
                        .into());
                    }
                }
                Ok(())
            }
        }
    }

    /// Build one trial's scenario of exactly `years` entries. Identical
    /// (config, years, seed) inputs yield identical sequences.
    pub fn build(&self, years: usize, seed: u64) -> Result<Scenario> {
        match self {
            ScenarioConfig::Historical {
                country,
                chunk_years,
                shuffle,
                randomize_start,
                cash_return,
            } => {
                let series = historical_series(country)?;
                Scenario::historical(
                    series,
                    chunk_years.unwrap_or(1),
                    *shuffle,
                    *randomize_start,
                    *cash_return,
                    years,
                    seed,
                )
            }
            ScenarioConfig::MonteCarlo {
                mean_stock_return,
                std_stock_return,
                mean_bond_return,
                std_bond_return,
                mean_inflation,
                std_inflation,
                cash_return,
            } => {
                let dist = |mean: f64, std: f64, field: &'static str| {
                    Normal::new(mean, std).map_err(|e| {
                        crate::error::KernelError::from(ConfigError::new(
                            field,
                            format!("invalid distribution parameters: {e}"),
                        ))
                    })
                };
                Ok(Scenario {
                    inner: ScenarioInner::MonteCarlo {
                        stock: dist(
                            *mean_stock_return,
                            *std_stock_return,
                            "scenario_config.std_stock_return",
                        )?,
                        bond: dist(
                            *mean_bond_return,
                            *std_bond_return,
                            "scenario_config.std_bond_return",
                        )?,
                        inflation: dist(
                            *mean_inflation,
                            *std_inflation,
                            "scenario_config.std_inflation",
                        )?,
                        cash_return: *cash_return,
                        rng: ChaCha8Rng::seed_from_u64(seed),
                        remaining: years,
                    },
                })
            }
        }
    }
}

enum ScenarioInner {
    Historical {
        stock: Vec<f64>,
        bond: Vec<f64>,
        inflation: Vec<f64>,
        cash_return: f64,
        pos: usize,
    },
    MonteCarlo {
        stock: Normal<f64>,
        bond: Normal<f64>,
        inflation: Normal<f64>,
        cash_return: f64,
        rng: ChaCha8Rng,
        remaining: usize,
    },
}

/// A finite, non-restartable sequence of market years for one trial.
pub struct Scenario {
    inner: ScenarioInner,
}

impl Scenario {
    /// Block-bootstrap a historical series.
    pub fn historical(
        series: &HistoricalSeries,
        chunk_years: u32,
        shuffle: bool,
        randomize_start: bool,
        cash_return: f64,
        years: usize,
        seed: u64,
    ) -> Result<Self> {
        let n = series.len();
        if chunk_years == 0 || chunk_years as usize > n {
            return Err(ConfigError::new(
                "scenario_config.chunk_years",
                format!("must be between 1 and the series length ({n})"),
            )
            .into());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let indices = bootstrap_indices(
            n,
            chunk_years as usize,
            shuffle,
            randomize_start,
            years,
            &mut rng,
        );

        Ok(Self {
            inner: ScenarioInner::Historical {
                stock: indices.iter().map(|&i| series.stock_returns[i]).collect(),
                bond: indices.iter().map(|&i| series.bond_returns[i]).collect(),
                inflation: indices
                    .iter()
                    .map(|&i| series.inflation_rates[i])
                    .collect(),
                cash_return,
                pos: 0,
            },
        })
    }

    /// Years left to emit.
    pub fn remaining(&self) -> usize {
        match &self.inner {
            ScenarioInner::Historical { stock, pos, .. } => stock.len() - pos,
            ScenarioInner::MonteCarlo { remaining, .. } => *remaining,
        }
    }
}

impl Iterator for Scenario {
    type Item = YearMarket;

    fn next(&mut self) -> Option<YearMarket> {
        match &mut self.inner {
            ScenarioInner::Historical {
                stock,
                bond,
                inflation,
                cash_return,
                pos,
            } => {
                if *pos >= stock.len() {
                    return None;
                }
                let market = YearMarket {
                    stock_return: stock[*pos],
                    bond_return: bond[*pos],
                    cash_return: *cash_return,
                    inflation: inflation[*pos],
                };
                *pos += 1;
                Some(market)
            }
            ScenarioInner::MonteCarlo {
                stock,
                bond,
                inflation,
                cash_return,
                rng,
                remaining,
            } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(YearMarket {
                    stock_return: stock.sample(rng).max(MIN_RETURN),
                    bond_return: bond.sample(rng).max(MIN_RETURN),
                    cash_return: *cash_return,
                    inflation: inflation.sample(rng).max(MIN_RETURN),
                })
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Select `years` indices into a series of length `n`.
///
/// Shuffled: draw block starts uniformly with replacement; each block is
/// `chunk` consecutive indices, wrapping at the end of the series so stocks,
/// bonds, and inflation of a calendar year always travel together.
/// Unshuffled: emit consecutive indices from the origin, wrapping as needed.
fn bootstrap_indices(
    n: usize,
    chunk: usize,
    shuffle: bool,
    randomize_start: bool,
    years: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let mut indices = Vec::with_capacity(years + chunk);

    if shuffle {
        while indices.len() < years {
            let start = rng.random_range(0..n);
            for offset in 0..chunk {
                indices.push((start + offset) % n);
            }
        }
    } else {
        let start = if randomize_start {
            rng.random_range(0..n)
        } else {
            0
        };
        for offset in 0..years {
            indices.push((start + offset) % n);
        }
    }

    indices.truncate(years);
    indices
}
