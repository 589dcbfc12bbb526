//! Typed project settings and path resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::effective::{ConfigError, EffectiveConfig};
use crate::merge::MergeOptions;

/// File name of the per-project configuration.
pub const PROJECT_CONFIG_FILE: &str = "mapt.toml";

/// Typed view of the effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub slices_dir: PathBuf,
    pub styles_dir: PathBuf,
    pub base_style: String,
    pub output_dir: PathBuf,
    pub tiles_base_url: String,
    pub engine: EngineSettings,
    pub keep_files: bool,
    pub strict: bool,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

/// External tile engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub program: String,

    /// Arguments placed before the generated ones on every invocation
    #[serde(default)]
    pub args: Vec<String>,
}

/// A project root plus its resolved configuration
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub effective: EffectiveConfig,
}

impl Project {
    /// Load a project, reading the host config from its default location.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        Self::load_with_host(root, host_config_path().as_deref(), config_path, cli_overrides)
    }

    /// Load a project with an explicit host config path.
    ///
    /// `<root>/mapt.toml` is optional; a `config_path` given explicitly must
    /// exist.
    pub fn load_with_host(
        root: &Path,
        host_config: Option<&Path>,
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = config_path.filter(|p| !p.is_file()) {
            return Err(ConfigError::IoError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let default_path = root.join(PROJECT_CONFIG_FILE);
        let project_path = config_path.unwrap_or(&default_path);

        let effective = EffectiveConfig::build(host_config, Some(project_path), cli_overrides)?;
        let config = effective.project_config()?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
            effective,
        })
    }

    pub fn slices_dir(&self) -> PathBuf {
        self.root.join(&self.config.slices_dir)
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.root.join(&self.config.styles_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            strict: self.config.strict,
        }
    }
}

/// Default host config location: `$XDG_CONFIG_HOME/mapt/config.toml`,
/// falling back to `~/.config/mapt/config.toml`.
pub fn host_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir).join("mapt/config.toml"));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/mapt/config.toml"))
}
