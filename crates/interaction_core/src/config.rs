use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub const SETTINGS_FILE: &str = "interaction.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_filter: String,
    /// Directories holding `*.toml` / `*.json` interaction documents.
    pub interaction_dirs: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            interaction_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    log_filter: Option<String>,
    interaction_dirs: Option<Vec<PathBuf>>,
}

/// Defaults, then `interaction.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> Settings {
    let settings = load_settings_from(Path::new(SETTINGS_FILE));
    apply_env_overrides(settings, |key| std::env::var(key).ok())
}

/// Defaults overlaid with the file at `path`. Missing or malformed files
/// leave the defaults untouched.
pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<FileSettings>(&raw) {
            if let Some(v) = file_cfg.log_filter {
                settings.log_filter = v;
            }
            if let Some(v) = file_cfg.interaction_dirs {
                settings.interaction_dirs = v;
            }
        }
    }

    settings
}

fn apply_env_overrides(
    mut settings: Settings,
    var: impl Fn(&str) -> Option<String>,
) -> Settings {
    if let Some(v) = var("INTERACTION_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = var("APP__INTERACTION_DIRS") {
        settings.interaction_dirs = v
            .split(',')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect();
    }

    settings
}

/// Installs the global `fmt` subscriber. Later calls keep the first
/// subscriber.
pub fn init_tracing(settings: &Settings) {
    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
