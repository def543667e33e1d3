use std::fmt;

/// A configuration problem detected before any trial runs.
///
/// `field` is the path of the offending option (e.g.
/// `"scenario_config.chunk_years"`) so callers can point at the exact input.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config at `{}`: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by the kernel entry points.
///
/// Trial-level outcomes (portfolio depletion, target miss) are data on the
/// per-trial reports, never errors.
#[derive(Debug, Clone)]
pub enum KernelError {
    Config(ConfigError),
    /// The run was cancelled between trials; partial work is discarded.
    Cancelled,
    /// An embedded reference-data bundle could not be loaded.
    ReferenceDataMissing {
        bundle: &'static str,
        reason: String,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Config(e) => write!(f, "{e}"),
            KernelError::Cancelled => write!(f, "simulation cancelled"),
            KernelError::ReferenceDataMissing { bundle, reason } => {
                write!(f, "reference data bundle `{bundle}` unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for KernelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KernelError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for KernelError {
    fn from(e: ConfigError) -> Self {
        KernelError::Config(e)
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
