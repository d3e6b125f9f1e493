//! Per-user configuration
//!
//! Settings come from (ascending precedence) a `config` file in
//! `~/.aksctl`, `AKSCTL_*` environment variables, then command flags.
//! The config file is optional; a missing file is not an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory under the user's home holding the config file and engine workspaces
pub const CONFIG_DIR_NAME: &str = ".aksctl";
const CONFIG_FILE_STEM: &str = "config";

pub const ORG_ENV: &str = "AKSCTL_ORG";
pub const PULUMI_ENV: &str = "AKSCTL_PULUMI";

const DEFAULT_PULUMI: &str = "pulumi";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("must specify pulumi org via flag, AKSCTL_ORG or config file")]
    MissingConfiguration,

    #[error("cannot locate the user's home directory")]
    NoHomeDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
    Json,
}

/// Candidate file names, in lookup order
const CANDIDATES: [(&str, Format); 5] = [
    ("config.toml", Format::Toml),
    ("config.yaml", Format::Yaml),
    ("config.yml", Format::Yaml),
    ("config.json", Format::Json),
    (CONFIG_FILE_STEM, Format::Toml),
];

/// Values read from the config file and environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Pulumi organization owning the stacks
    #[serde(default)]
    pub org: Option<String>,

    /// Path to the pulumi binary
    #[serde(default)]
    pub pulumi: Option<PathBuf>,

    /// Root directory for per-stack engine workspaces
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,

    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the per-user directory, then apply the environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match config_dir() {
            Some(dir) => Self::from_dir(&dir)?,
            None => Settings::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Read the first config file found in `dir`
    ///
    /// Returns default settings when the directory holds no config file.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        for (file_name, format) in CANDIDATES {
            let path = dir.join(file_name);
            if !path.is_file() {
                continue;
            }

            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let mut settings = parse(&contents, format).map_err(|message| ConfigError::Parse {
                path: path.clone(),
                message,
            })?;

            debug!(path = %path.display(), "Using config file");
            settings.source = Some(path);
            return Ok(settings);
        }

        Ok(Settings::default())
    }

    /// Overlay environment variables; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(org) = non_empty(lookup(ORG_ENV)) {
            self.org = Some(org);
        }
        if let Some(pulumi) = non_empty(lookup(PULUMI_ENV)) {
            self.pulumi = Some(PathBuf::from(pulumi));
        }
    }

    /// Resolve the organization, letting a non-empty flag win
    pub fn resolve_org(&self, flag: Option<&str>) -> Result<String, ConfigError> {
        non_empty(flag.map(str::to_string))
            .or_else(|| non_empty(self.org.clone()))
            .ok_or(ConfigError::MissingConfiguration)
    }

    pub fn pulumi_binary(&self) -> PathBuf {
        self.pulumi
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PULUMI))
    }

    /// Root for engine workspaces, `$HOME/.aksctl/workspaces` by default
    pub fn workspace_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.workspace_dir {
            Some(dir) => Ok(dir.clone()),
            None => config_dir()
                .map(|dir| dir.join("workspaces"))
                .ok_or(ConfigError::NoHomeDirectory),
        }
    }
}

fn parse(contents: &str, format: Format) -> Result<Settings, String> {
    match format {
        Format::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        Format::Yaml if contents.trim().is_empty() => Ok(Settings::default()),
        Format::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `~/.aksctl`, if a home directory can be determined
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
