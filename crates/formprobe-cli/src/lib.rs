//! formprobe CLI library
//!
//! Command-line runner for formprobe: a one-shot readiness check, the login
//! scenario suite, and configuration display.

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;
mod runner;
pub mod scenarios;

pub use commands::{CheckArgs, Cli, ColorArg, Commands, ConfigArgs, ConfigFormat, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Reporter;
#[cfg(feature = "browser")]
pub use runner::ChromiumFactory;
pub use runner::{navigated, ScenarioResult, ScenarioResults, ScenarioRunner, SessionFactory};
pub use scenarios::{Check, Scenario};
