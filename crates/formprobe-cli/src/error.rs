//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("Scenario run failed: {message}")]
    ScenarioFailed {
        /// Error message
        message: String,
    },

    /// The page came up degraded
    #[error("Page degraded: {}", .reasons.join("; "))]
    Degraded {
        /// Why the page is not ready
        reasons: Vec<String>,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core library error
    #[error("Probe error: {0}")]
    Probe(#[from] formprobe::ProbeError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario failure error
    #[must_use]
    pub fn scenario_failed(message: impl Into<String>) -> Self {
        Self::ScenarioFailed {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code: 2 for a degraded page, 1 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Degraded { .. } => 2,
            _ => 1,
        }
    }
}
