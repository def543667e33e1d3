use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use simre_core::config::{AccumulationConfig, CombinedConfig, WithdrawalConfig};
use simre_core::api::{
    list_countries, list_tax_regions, run_accumulation, run_combined, run_withdrawal,
    validate_accumulation, validate_combined, validate_withdrawal,
};

mod report;

#[derive(Parser, Debug)]
#[command(name = "simre")]
#[command(about = "Monte Carlo retirement and savings simulator")]
struct Args {
    /// Log level (debug, info, warn, error); RUST_LOG overrides
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Mode {
    Withdrawal,
    Accumulation,
    Combined,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Txt,
    Csv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation from a JSON config file
    Run {
        /// Path to the config file
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Withdrawal)]
        mode: Mode,
        /// Override the master seed from the config
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = Format::Txt)]
        format: Format,
    },
    /// Validate a config file without running it
    Validate {
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Withdrawal)]
        mode: Mode,
    },
    /// List bundled tax regions per country
    Regions,
    /// List countries with historical market data
    Countries,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("simre={level},simre_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_config<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn run(path: &PathBuf, mode: Mode, seed: Option<u64>, format: Format) -> Result<()> {
    match mode {
        Mode::Withdrawal => {
            let mut config: WithdrawalConfig = read_config(path)?;
            if seed.is_some() {
                config.seed = seed;
            }
            let result = run_withdrawal(&config).context("withdrawal simulation failed")?;
            let rendered = match format {
                Format::Txt => report::withdrawal_txt(&result),
                Format::Csv => report::withdrawal_csv(&result),
                Format::Json => serde_json::to_string_pretty(&result)?,
            };
            println!("{rendered}");
        }
        Mode::Accumulation => {
            let mut config: AccumulationConfig = read_config(path)?;
            if seed.is_some() {
                config.seed = seed;
            }
            let result = run_accumulation(&config).context("accumulation simulation failed")?;
            let rendered = match format {
                Format::Txt => report::accumulation_txt(&result),
                Format::Csv => report::accumulation_csv(&result),
                Format::Json => serde_json::to_string_pretty(&result)?,
            };
            println!("{rendered}");
        }
        Mode::Combined => {
            let mut config: CombinedConfig = read_config(path)?;
            if seed.is_some() {
                config.seed = seed;
            }
            let result = run_combined(&config).context("combined simulation failed")?;
            let rendered = match format {
                Format::Txt => report::combined_txt(&result),
                Format::Csv => report::combined_csv(&result),
                Format::Json => serde_json::to_string_pretty(&result)?,
            };
            println!("{rendered}");
        }
    }
    Ok(())
}

fn validate(path: &PathBuf, mode: Mode) -> Result<()> {
    match mode {
        Mode::Withdrawal => {
            let config: WithdrawalConfig = read_config(path)?;
            let normalized = validate_withdrawal(&config)?;
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }
        Mode::Accumulation => {
            let config: AccumulationConfig = read_config(path)?;
            let normalized = validate_accumulation(&config)?;
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }
        Mode::Combined => {
            let config: CombinedConfig = read_config(path)?;
            let normalized = validate_combined(&config)?;
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match &args.command {
        Command::Run {
            config,
            mode,
            seed,
            format,
        } => run(config, *mode, *seed, *format)?,
        Command::Validate { config, mode } => validate(config, *mode)?,
        Command::Regions => {
            let regions = list_tax_regions()?;
            for (country, names) in &regions {
                println!("{country}: {}", names.join(", "));
            }
        }
        Command::Countries => {
            let countries = list_countries()?;
            for (country, info) in &countries {
                println!(
                    "{country}: {}-{} ({} years)",
                    info.start_year, info.end_year, info.num_years
                );
            }
        }
    }

    tracing::debug!("done");
    Ok(())
}
