//! Command dispatch: bridges CLI args -> scenario replay -> output formatting.

pub mod config_cmd;
pub mod replay;
pub mod snapshot;
pub mod util;

use std::path::PathBuf;

use midimirror_config::Config;

use crate::cli::{ColorMode, Command, OutputFormat};
use crate::error::CliError;

/// Settings resolved once from flags, environment, and the config file.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub color: ColorMode,
    pub quiet: bool,
    pub yes: bool,
}

/// Dispatch a scenario-driven command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session) -> Result<(), CliError> {
    match cmd {
        Command::Replay(args) => replay::handle(args, session).await,
        Command::Snapshot(args) => snapshot::handle(args, session).await,
        Command::Config(args) => config_cmd::handle(args, session),
        // Completions are generated before a session exists
        Command::Completions(_) => Ok(()),
    }
}
