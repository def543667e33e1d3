//! Shared immutable reference data.
//!
//! Two bundles ship inside the binary and are parsed once on first use:
//! a country-keyed table of historical annual market data, and a
//! region-keyed table of tax schedules. Everything handed out from here is
//! `&'static` and read-only, so trials can share it freely across workers.

mod historical;
mod tax_schedule;

pub use historical::{CountryInfo, HistoricalSeries, historical_series, list_countries};
pub use tax_schedule::{TaxBracket, TaxSchedule, list_tax_regions, tax_schedule};
