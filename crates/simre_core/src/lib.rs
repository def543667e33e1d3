//! Retirement simulation kernel
//!
//! This crate simulates long-horizon personal-finance outcomes under
//! uncertainty by running many independent multi-decade trials through a
//! common per-year pipeline. It supports:
//! - Historical block-bootstrap and Monte Carlo market scenarios
//! - Withdrawal strategies with internal state (Fixed SWR, Constant Dollar,
//!   Hebeler Autopilot II, Cash Buffer)
//! - Progressive regional taxes with inflation-indexed brackets and a
//!   closed-form net-to-gross solver
//! - Accumulation, withdrawal, and combined simulation modes
//! - Parallel trial fan-out with deterministic seeding and paired-sample
//!   strategy comparison
//!
//! The entry points live in [`api`]:
//!
//! ```ignore
//! use simre_core::api::run_withdrawal;
//! use simre_core::config::WithdrawalConfig;
//!
//! let config: WithdrawalConfig = serde_json::from_str(json)?;
//! let result = run_withdrawal(&config)?;
//! println!("success rate: {:.1}%", result.summary.success_rate * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod api;
pub mod scenario;
pub mod simulation;
pub mod strategy;
pub mod tax;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod data;
pub mod error;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use api::{
    AccumulationResult, CombinedResult, StrategyRun, StrategySummary, Summary, WithdrawalResult,
    run_accumulation, run_combined, run_withdrawal,
};
pub use config::{AccumulationConfig, CombinedConfig, PortfolioConfig, WithdrawalConfig};
pub use error::{ConfigError, KernelError};
pub use simulation::CancelToken;
