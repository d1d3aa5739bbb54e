use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::utils::dir::home_dir;

const SETTINGS_FILE_NAMES: [&str; 2] = ["settings.toml", "clk.toml"];

/// User settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    /// Location of the ledger.
    pub file: PathBuf,
    /// Task started by `add` when no words are given.
    pub default_task: String,
    /// Program `open` runs with the ledger as its only argument.
    pub editor_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file: home_dir().unwrap_or_default().join("clock.txt"),
            default_task: "Started empty task".to_string(),
            editor_command: "code".to_string(),
        }
    }
}

impl Settings {
    /// Loads `explicit` if given, otherwise the first settings file under `~/.clk`. Falls back
    /// to defaults when nothing can be read.
    pub fn load(explicit: Option<&Path>) -> Self {
        let candidates = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => Self::default_paths(),
        };

        for path in candidates {
            if !path.exists() {
                if explicit.is_some() {
                    warn!("Settings file does not exist: {}", path.display());
                }
                continue;
            }
            match Self::read(&path) {
                Ok(settings) => {
                    debug!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => warn!("{e:#}"),
            }
        }

        Self::default()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn default_paths() -> Vec<PathBuf> {
        let Some(home) = home_dir() else {
            return vec![];
        };
        SETTINGS_FILE_NAMES
            .iter()
            .map(|name| home.join(".clk").join(name))
            .collect()
    }
}
