//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `QUORUM_TABLE_DISCUSSION__ROUND_LIMIT=5`
pub const ENV_PREFIX: &str = "QUORUM_TABLE_";

const PROJECT_FILES: [&str; 2] = ["table.toml", ".table.toml"];

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./table.toml` or `./.table.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/quorum-table/config.toml`
    /// 4. `QUORUM_TABLE_*` environment variables
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// The merged provider stack, before extraction
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/quorum-table/config.toml if set,
    /// otherwise falls back to ~/.config/quorum-table/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("quorum-table").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe the config sources in priority order (for `config --sources`)
    pub fn describe_sources(config_path: Option<&Path>) -> Vec<String> {
        let mark = |found: bool| if found { "[FOUND]" } else { "[     ]" };
        let mut lines = Vec::new();

        if let Some(path) = config_path {
            lines.push(format!("{} Explicit: {}", mark(path.exists()), path.display()));
        }
        match Self::project_config_path() {
            Some(path) => lines.push(format!("{} Project: {}", mark(true), path.display())),
            None => lines.push(format!("{} Project: ./table.toml or ./.table.toml", mark(false))),
        }
        if let Some(path) = Self::global_config_path() {
            lines.push(format!("{} Global:  {}", mark(path.exists()), path.display()));
        }
        let env_set = std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX));
        lines.push(format!("{} Env:     {}*", mark(env_set), ENV_PREFIX));
        lines.push(format!("{} Default: built-in defaults", mark(true)));
        lines
    }
}
