use std::collections::BTreeMap;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::error::{ConfigError, KernelError, Result};

const TAX_BUNDLE: &str = include_str!("../../data/tax_regions.json");

/// A progressive bracket: `rate` applies to the slice of the base above
/// `threshold` and below the next bracket's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct TaxBracket {
    pub threshold: f64,
    pub rate: f64,
}

/// Immutable tax schedule for one region.
///
/// Thresholds are in base-year money; when bracket indexing is enabled they
/// are scaled by cumulative inflation at evaluation time. An empty wealth
/// bracket list means the region levies no wealth tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct TaxSchedule {
    pub base_year: i32,
    pub income_brackets: Vec<TaxBracket>,
    pub wealth_brackets: Vec<TaxBracket>,
    /// Subtracted from taxable wealth before the wealth brackets apply.
    pub wealth_allowance: f64,
}

#[derive(Debug, Deserialize)]
struct RawCountry {
    regions: FxHashMap<String, TaxSchedule>,
}

fn validate_brackets(kind: &str, region: &str, brackets: &[TaxBracket]) -> std::result::Result<(), String> {
    for pair in brackets.windows(2) {
        if pair[1].threshold <= pair[0].threshold {
            return Err(format!(
                "{kind} thresholds for region `{region}` must be strictly ascending"
            ));
        }
        if pair[1].rate < pair[0].rate {
            return Err(format!(
                "{kind} rates for region `{region}` must be non-decreasing"
            ));
        }
    }
    Ok(())
}

fn registry() -> Result<&'static FxHashMap<String, FxHashMap<String, TaxSchedule>>> {
    static REGISTRY: OnceLock<
        std::result::Result<FxHashMap<String, FxHashMap<String, TaxSchedule>>, String>,
    > = OnceLock::new();

    REGISTRY
        .get_or_init(|| {
            let raw: FxHashMap<String, RawCountry> =
                serde_json::from_str(TAX_BUNDLE).map_err(|e| e.to_string())?;

            let mut out = FxHashMap::default();
            for (country, data) in raw {
                for (region, schedule) in &data.regions {
                    validate_brackets("income bracket", region, &schedule.income_brackets)?;
                    validate_brackets("wealth bracket", region, &schedule.wealth_brackets)?;
                }
                out.insert(country, data.regions);
            }
            Ok(out)
        })
        .as_ref()
        .map_err(|reason| KernelError::ReferenceDataMissing {
            bundle: "tax_regions",
            reason: reason.clone(),
        })
}

/// Look up the schedule for a country/region pair (case-insensitive).
pub fn tax_schedule(country: &str, region: &str) -> Result<&'static TaxSchedule> {
    let registry = registry()?;
    let regions = registry.get(&country.to_ascii_lowercase()).ok_or_else(|| {
        let mut known: Vec<&str> = registry.keys().map(String::as_str).collect();
        known.sort_unstable();
        KernelError::from(ConfigError::new(
            "tax_config.country",
            format!("unknown country `{country}`; available: {}", known.join(", ")),
        ))
    })?;
    regions.get(&region.to_ascii_lowercase()).ok_or_else(|| {
        let mut known: Vec<&str> = regions.keys().map(String::as_str).collect();
        known.sort_unstable();
        ConfigError::new(
            "tax_config.region",
            format!("unknown region `{region}`; available: {}", known.join(", ")),
        )
        .into()
    })
}

/// All bundled regions, keyed by country. Sorted on both levels.
pub fn list_tax_regions() -> Result<BTreeMap<String, Vec<String>>> {
    Ok(registry()?
        .iter()
        .map(|(country, regions)| {
            let mut names: Vec<String> = regions.keys().cloned().collect();
            names.sort_unstable();
            (country.clone(), names)
        })
        .collect())
}
