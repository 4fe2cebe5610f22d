//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use midimirror_config::ConfigError;
use midimirror_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Scenario files ───────────────────────────────────────────────

    #[error("Scenario file not found: {path}")]
    #[diagnostic(
        code(midimirror::scenario_not_found),
        help("Pass the path to a .toml, .yaml, or .json scenario file.")
    )]
    ScenarioNotFound { path: String },

    #[error("Unsupported scenario format for {path}")]
    #[diagnostic(
        code(midimirror::scenario_format),
        help("Scenario files must end in .toml, .yaml, .yml, or .json.")
    )]
    ScenarioFormat { path: String },

    #[error("Could not parse scenario {path}: {reason}")]
    #[diagnostic(code(midimirror::scenario_parse))]
    ScenarioParse { path: String, reason: String },

    #[error("Scenario step {step} is invalid: {reason}")]
    #[diagnostic(
        code(midimirror::scenario_step),
        help("Steps refer to objects by the `key` they were declared with.")
    )]
    ScenarioStep { step: usize, reason: String },

    // ── Mirror ───────────────────────────────────────────────────────

    #[error("Mirror error: {message}")]
    #[diagnostic(
        code(midimirror::mirror),
        help("Re-run with -vv for reconciliation logs.")
    )]
    Mirror { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(midimirror::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists: {path}")]
    #[diagnostic(
        code(midimirror::config_exists),
        help("Use `midimirror config init --force` to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(midimirror::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(midimirror::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(midimirror::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScenarioNotFound { .. } => exit_code::NOT_FOUND,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::ScenarioFormat { .. }
            | Self::ScenarioParse { .. }
            | Self::ScenarioStep { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(inner) => Self::Config(inner),
            ConfigError::Io(inner) => Self::Io(inner),
            ConfigError::Serialization(inner) => Self::Render(inner.to_string()),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnmirroredCategory { category } => Self::Validation {
                field: "category".into(),
                reason: format!("{category} is not mirrored; add it with --category"),
            },
            other => Self::Mirror {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midimirror_core::{Category, Handle, UniqueId};

    #[test]
    fn usage_errors_exit_with_two() {
        let err = CliError::ScenarioStep {
            step: 3,
            reason: "unknown key".into(),
        };
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(
            CliError::ScenarioNotFound { path: "x".into() }.exit_code(),
            exit_code::NOT_FOUND
        );
    }

    #[test]
    fn core_errors_map_to_mirror_or_validation() {
        let err = CliError::from(CoreError::DuplicateUniqueId {
            unique_id: UniqueId::new(4),
        });
        assert!(matches!(err, CliError::Mirror { .. }));
        assert_eq!(err.exit_code(), exit_code::GENERAL);

        let err = CliError::from(CoreError::UnmirroredCategory {
            category: Category::Entity,
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);

        let err = CliError::from(CoreError::ObjectVanished {
            handle: Handle::new(1),
        });
        assert!(err.to_string().contains("0x1"));
    }
}
