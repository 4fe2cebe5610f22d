mod cli;
mod commands;
mod error;
mod output;
mod scenario;

use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use midimirror_config::{self as config, Config, ConfigError};
use midimirror_core::Category;

use crate::cli::{CategoryArg, Cli, ColorMode, Command, ConfigCommand, GlobalOpts, OutputFormat};
use crate::commands::Session;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(config::config_path);
    let loaded = config::load_config_from(&config_path);

    let level = loaded
        .as_ref()
        .map_or("warn", |cfg| cfg.defaults.log_level.as_str())
        .to_owned();
    init_tracing(cli.global.verbose, &level);

    if let Err(err) = run(cli, config_path, loaded).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins, then `-v` counts, then the configured level.
fn init_tracing(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(
    cli: Cli,
    config_path: std::path::PathBuf,
    loaded: Result<Config, ConfigError>,
) -> Result<(), CliError> {
    if let Command::Completions(args) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(args.shell, &mut cmd, "midimirror", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = match loaded {
        Ok(cfg) => cfg,
        // A broken file must not block locating or replacing it
        Err(err) if matches!(&cli.command, Command::Config(args) if !matches!(args.command, ConfigCommand::Show)) => {
            tracing::warn!(error = %err, "ignoring unreadable config");
            Config::default()
        }
        Err(err) => return Err(err.into()),
    };
    if !cli.global.category.is_empty() {
        config.mirror.categories = cli.global.category.iter().copied().map(category).collect();
    }

    let session = Session {
        format: resolve_format(&cli.global, &config)?,
        color: resolve_color(&cli.global, &config)?,
        quiet: cli.global.quiet,
        yes: cli.global.yes,
        config,
        config_path,
    };

    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, &session).await
}

fn resolve_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    match global.output {
        Some(format) => Ok(format),
        None => parse_setting("defaults.output", &cfg.defaults.output),
    }
}

fn resolve_color(global: &GlobalOpts, cfg: &Config) -> Result<ColorMode, CliError> {
    match global.color {
        Some(mode) => Ok(mode),
        None => parse_setting("defaults.color", &cfg.defaults.color),
    }
}

fn parse_setting<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

fn category(arg: CategoryArg) -> Category {
    match arg {
        CategoryArg::Device => Category::Device,
        CategoryArg::ExternalDevice => Category::ExternalDevice,
        CategoryArg::Entity => Category::Entity,
        CategoryArg::Source => Category::Source,
        CategoryArg::Destination => Category::Destination,
    }
}
