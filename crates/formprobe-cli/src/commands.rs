//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ColorChoice;

/// formprobe: readiness checks and login scenarios for forms you do not control
#[derive(Parser, Debug)]
#[command(name = "formprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Configuration file (defaults to ./formprobe.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the login page and report whether the form is ready
    Check(CheckArgs),

    /// Run the login scenario suite
    Run(RunArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Page to open (overrides base_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Per-candidate timeout in milliseconds (overrides wait.timeout_ms)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Only run scenarios whose name matches this regex
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop at the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// List matching scenarios without running them
    #[arg(long)]
    pub list: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Configuration output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML, the config file format
    #[default]
    Yaml,
    /// JSON
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
