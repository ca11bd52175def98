//! formprobe: readiness checks and login scenarios
//!
//! ## Usage
//!
//! ```bash
//! formprobe check --url https://dev-dash.janitri.in/   # Is the login form usable?
//! formprobe run --filter '^invalid_'                    # Run matching scenarios
//! formprobe config --format json                        # Show effective config
//! ```

use clap::Parser;
use formprobe_cli::{handlers, logging, Cli, CliConfig, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config)?;

    let probe = handlers::load_probe_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => handlers::execute_check(&config, probe, &args),
        Commands::Run(args) => handlers::execute_run(config, probe, &args),
        Commands::Config(args) => handlers::execute_config(&probe, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_json(cli.log_json)
}
