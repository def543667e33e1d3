use std::collections::BTreeMap;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::error::{ConfigError, KernelError, Result};

const HISTORICAL_BUNDLE: &str = include_str!("../../data/historical_returns.json");

/// Aligned annual arrays for one country. Every vector has the same length
/// and index; position `i` is calendar year `years[i]`.
#[derive(Debug, Clone)]
pub struct HistoricalSeries {
    pub years: Vec<i32>,
    pub stock_returns: Vec<f64>,
    pub bond_returns: Vec<f64>,
    pub inflation_rates: Vec<f64>,
}

impl HistoricalSeries {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn start_year(&self) -> i32 {
        self.years.first().copied().unwrap_or(0)
    }

    pub fn end_year(&self) -> i32 {
        self.years.last().copied().unwrap_or(0)
    }
}

/// Data range advertised for a country via `list_countries`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CountryInfo {
    pub start_year: i32,
    pub end_year: i32,
    pub num_years: usize,
}

#[derive(Debug, Deserialize)]
struct RawCountry {
    series: Vec<RawYear>,
}

#[derive(Debug, Deserialize)]
struct RawYear {
    year: i32,
    stock: f64,
    bond: f64,
    inflation: f64,
}

fn registry() -> Result<&'static FxHashMap<String, HistoricalSeries>> {
    static REGISTRY: OnceLock<std::result::Result<FxHashMap<String, HistoricalSeries>, String>> =
        OnceLock::new();

    REGISTRY
        .get_or_init(|| {
            let raw: FxHashMap<String, RawCountry> =
                serde_json::from_str(HISTORICAL_BUNDLE).map_err(|e| e.to_string())?;

            let mut out = FxHashMap::default();
            for (country, data) in raw {
                if data.series.is_empty() {
                    return Err(format!("country `{country}` has an empty series"));
                }
                let mut series = HistoricalSeries {
                    years: Vec::with_capacity(data.series.len()),
                    stock_returns: Vec::with_capacity(data.series.len()),
                    bond_returns: Vec::with_capacity(data.series.len()),
                    inflation_rates: Vec::with_capacity(data.series.len()),
                };
                for y in data.series {
                    series.years.push(y.year);
                    series.stock_returns.push(y.stock);
                    series.bond_returns.push(y.bond);
                    series.inflation_rates.push(y.inflation);
                }
                out.insert(country, series);
            }
            Ok(out)
        })
        .as_ref()
        .map_err(|reason| KernelError::ReferenceDataMissing {
            bundle: "historical_returns",
            reason: reason.clone(),
        })
}

/// Look up the historical series for a country (case-insensitive key).
pub fn historical_series(country: &str) -> Result<&'static HistoricalSeries> {
    let registry = registry()?;
    registry
        .get(&country.to_ascii_lowercase())
        .ok_or_else(|| {
            let mut known: Vec<&str> = registry.keys().map(String::as_str).collect();
            known.sort_unstable();
            ConfigError::new(
                "scenario_config.country",
                format!("unknown country `{country}`; available: {}", known.join(", ")),
            )
            .into()
        })
}

/// Countries with historical data, with their year ranges. Sorted by name so
/// output is stable.
pub fn list_countries() -> Result<BTreeMap<String, CountryInfo>> {
    Ok(registry()?
        .iter()
        .map(|(country, series)| {
            (
                country.clone(),
                CountryInfo {
                    start_year: series.start_year(),
                    end_year: series.end_year(),
                    num_years: series.len(),
                },
            )
        })
        .collect())
}
