//! Config subcommand handlers.

use midimirror_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;
use crate::output;

use super::{Session, util};

fn detail(cfg: &Config) -> String {
    let categories: Vec<String> = cfg.mirror.categories.iter().map(ToString::to_string).collect();
    [
        format!("Output:      {}", cfg.defaults.output),
        format!("Color:       {}", cfg.defaults.color),
        format!("Log level:   {}", cfg.defaults.log_level),
        format!("Client name: {}", cfg.mirror.client_name),
        format!("Categories:  {}", categories.join(", ")),
    ]
    .join("\n")
}

pub fn handle(args: ConfigArgs, session: &Session) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&session.config_path.display().to_string(), session.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let rendered = output::render_single(
                session.format,
                &session.config,
                detail,
                |cfg| toml::to_string(cfg).unwrap_or_default(),
            )?;
            output::print_output(&rendered, session.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = &session.config_path;
            if path.exists() {
                if !force {
                    return Err(CliError::ConfigExists {
                        path: path.display().to_string(),
                    });
                }
                let prompt = format!("Overwrite {}?", path.display());
                if !util::confirm(&prompt, "config init --force", session.yes)? {
                    output::print_status("Aborted.", session.quiet);
                    return Ok(());
                }
            }

            config::save_config_to(&Config::default(), path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            output::print_status(
                &format!("Config written to {}", path.display()),
                session.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use crate::cli::{ColorMode, OutputFormat};

    use super::*;

    fn session(path: PathBuf, yes: bool) -> Session {
        Session {
            config: Config::default(),
            config_path: path,
            format: OutputFormat::Table,
            color: ColorMode::Never,
            quiet: true,
            yes,
        }
    }

    #[test]
    fn detail_lists_every_category() {
        let text = detail(&Config::default());
        assert!(text.contains("external-device"));
        assert!(text.contains("Client name: midimirror"));
    }

    #[test]
    fn init_refuses_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let args = ConfigArgs {
            command: ConfigCommand::Init { force: false },
        };
        let err = handle(args, &session(path, false)).unwrap_err();
        assert!(matches!(err, CliError::ConfigExists { .. }));
    }

    #[test]
    fn init_force_with_yes_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "garbage").unwrap();

        let args = ConfigArgs {
            command: ConfigCommand::Init { force: true },
        };
        handle(args, &session(path.clone(), true)).unwrap();
        let written: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
    }
}
