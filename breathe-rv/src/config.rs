//! Service configuration for breathe-rv
//!
//! Resolution priority per setting: environment variable, then the platform
//! TOML config file, then the compiled default.

use breathe_common::config::{self, TomlConfig};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5810;
const DEFAULT_SCORER_URL: &str = "http://127.0.0.1:5001";

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root folder holding the database, uploads, and the user directory
    pub root_folder: PathBuf,
    pub port: u16,
    /// Base URL of the external scorer service
    pub scorer_url: String,
    /// Base URL used when building image links in responses
    pub public_base_url: String,
}

impl Config {
    /// Resolve configuration from CLI root-folder override, environment,
    /// the platform config file, and defaults.
    pub fn resolve(cli_root: Option<&str>) -> Config {
        let toml_config = config::default_config_path().and_then(|path| {
            match config::load_toml_config(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Ignoring unreadable config file: {}", e);
                    None
                }
            }
        });

        Self::from_sources(cli_root, toml_config.as_ref())
    }

    fn from_sources(cli_root: Option<&str>, toml_config: Option<&TomlConfig>) -> Config {
        let root_folder = config::resolve_root_folder(cli_root, "BREATHE_ROOT_FOLDER", toml_config);

        let port = env_var("BREATHE_PORT")
            .and_then(|v| v.parse().ok())
            .or_else(|| toml_config.and_then(|c| c.port))
            .unwrap_or(DEFAULT_PORT);

        let scorer_url = env_var("BREATHE_SCORER_URL")
            .or_else(|| toml_config.and_then(|c| c.scorer_url.clone()))
            .unwrap_or_else(|| DEFAULT_SCORER_URL.to_string());

        let public_base_url = env_var("BREATHE_PUBLIC_BASE_URL")
            .or_else(|| toml_config.and_then(|c| c.public_base_url.clone()))
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", port));

        Config {
            root_folder,
            port,
            scorer_url,
            public_base_url,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("breathe.db")
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.root_folder.join("uploads")
    }

    pub fn users_file(&self) -> PathBuf {
        self.root_folder.join("data").join("users.json")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_values_fill_unset_settings() {
        let toml_config = TomlConfig {
            root_folder: Some("/srv/breathe".to_string()),
            port: Some(6000),
            scorer_url: Some("http://scorer:5001".to_string()),
            public_base_url: None,
        };

        let config = Config::from_sources(None, Some(&toml_config));
        assert_eq!(config.root_folder, PathBuf::from("/srv/breathe"));
        assert_eq!(config.port, 6000);
        assert_eq!(config.scorer_url, "http://scorer:5001");
        assert_eq!(config.public_base_url, "http://127.0.0.1:6000");
    }

    #[test]
    fn derived_paths_hang_off_root() {
        let config = Config::from_sources(Some("/srv/breathe"), None);
        assert_eq!(config.database_path(), PathBuf::from("/srv/breathe/breathe.db"));
        assert_eq!(config.uploads_root(), PathBuf::from("/srv/breathe/uploads"));
        assert_eq!(
            config.users_file(),
            PathBuf::from("/srv/breathe/data/users.json")
        );
    }
}
