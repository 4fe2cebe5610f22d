//! Shared configuration for midimirror tools.
//!
//! Layered loading (built-in defaults, then the TOML file, then
//! `MIDIMIRROR_` environment variables) and translation of the `[mirror]`
//! table into a ready-to-run `midimirror_core::Mirror`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use midimirror_core::{Category, HandleSource, MidiContext, Mirror};

/// Environment prefix; nested keys are separated by a double underscore
/// (`MIDIMIRROR_DEFAULTS__LOG_LEVEL`).
pub const ENV_PREFIX: &str = "MIDIMIRROR_";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Presentation defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    /// What to mirror and under which client name.
    #[serde(default)]
    pub mirror: MirrorSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Tracing filter used when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            log_level: default_log_level(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_log_level() -> String {
    "warn".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorSettings {
    /// Name the mirror registers with the MIDI subsystem.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Categories to keep lists for, in list order.
    #[serde(default = "all_categories")]
    pub categories: Vec<Category>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            categories: all_categories(),
        }
    }
}

fn default_client_name() -> String {
    "midimirror".into()
}

fn all_categories() -> Vec<Category> {
    Category::all()
}

impl MirrorSettings {
    /// Context bound to `source` under the configured client name.
    pub fn context(&self, source: Arc<dyn HandleSource>) -> MidiContext {
        MidiContext::new(self.client_name.clone(), source)
    }

    /// An empty mirror over the configured categories.
    pub fn build_mirror(&self, source: Arc<dyn HandleSource>) -> Mirror {
        Mirror::new(self.context(source), self.categories.iter().copied())
    }
}

impl Config {
    /// Reject values the loader accepts but nothing downstream can use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mirror.client_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "mirror.client_name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.mirror.categories.is_empty() {
            return Err(ConfigError::Validation {
                field: "mirror.categories".into(),
                reason: "at least one category is required".into(),
            });
        }
        let level = self.defaults.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.log_level".into(),
                reason: format!(
                    "expected one of {}, got '{}'",
                    LOG_LEVELS.join(", "),
                    self.defaults.log_level
                ),
            });
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "midimirror", "midimirror").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("midimirror");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not
/// an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("missing.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.defaults.output, "table");
            assert_eq!(cfg.mirror.categories.len(), 5);
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [defaults]
                output = "json"

                [mirror]
                client_name = "studio"
                categories = ["source", "destination"]
                "#,
            )?;
            jail.set_env("MIDIMIRROR_DEFAULTS__LOG_LEVEL", "debug");
            jail.set_env("MIDIMIRROR_MIRROR__CLIENT_NAME", "override");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.defaults.output, "json");
            assert_eq!(cfg.defaults.color, "auto");
            assert_eq!(cfg.defaults.log_level, "debug");
            assert_eq!(cfg.mirror.client_name, "override");
            assert_eq!(
                cfg.mirror.categories,
                vec![Category::Source, Category::Destination]
            );
            Ok(())
        });
    }

    #[test]
    fn empty_category_list_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[mirror]\ncategories = []\n")?;
            let err = load_config_from(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "mirror.categories"));
            Ok(())
        });
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = Config::default();
        cfg.defaults.log_level = "loud".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.mirror.categories = vec![Category::ExternalDevice];

        save_config_to(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("external-device"));

        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn build_mirror_uses_configured_categories() {
        let settings = MirrorSettings {
            client_name: "unit".into(),
            categories: vec![Category::Entity, Category::Entity, Category::Device],
        };
        let mirror = settings.build_mirror(Arc::new(midimirror_core::SimulatedSource::new()));
        assert_eq!(mirror.categories(), vec![Category::Entity, Category::Device]);
        assert_eq!(mirror.context().client_name(), "unit");
    }

    #[test]
    fn canonical_path_follows_xdg_config_home() {
        Jail::expect_with(|jail| {
            let root = jail.directory().to_path_buf();
            jail.set_env("XDG_CONFIG_HOME", root.display());
            jail.set_env("HOME", root.display());

            let mut cfg = Config::default();
            cfg.mirror.client_name = "saved".into();
            let path = save_config(&cfg).map_err(|e| e.to_string())?;
            assert!(path.starts_with(&root));
            assert_eq!(path, config_path());

            let loaded = load_config().map_err(|e| e.to_string())?;
            assert_eq!(loaded.mirror.client_name, "saved");
            Ok(())
        });
    }
}
