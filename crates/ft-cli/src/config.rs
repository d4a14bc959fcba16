//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ft_core::{AppId, DEFAULT_IGNORED_APPS};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Application identifiers that are tracked but never reported.
    pub ignored_apps: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ft.db"),
            ignored_apps: DEFAULT_IGNORED_APPS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FT_*)
        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    /// The ignore-set as validated identifiers. Empty entries are skipped.
    pub fn ignored_app_ids(&self) -> Vec<AppId> {
        self.ignored_apps
            .iter()
            .filter_map(|id| match AppId::new(id.as_str()) {
                Ok(app_id) => Some(app_id),
                Err(err) => {
                    tracing::warn!(%err, "skipping ignored_apps entry");
                    None
                }
            })
            .collect()
    }

    /// Path of the lock file guarding the database against concurrent watchers.
    pub fn lock_path(&self) -> PathBuf {
        let mut path = self.database_path.clone().into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}
