//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Service configuration loaded from a TOML file.
///
/// All fields are optional; environment variables take priority over the
/// file, and compiled defaults fill whatever remains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database, uploads, and the user directory
    pub root_folder: Option<String>,
    /// TCP port to listen on
    pub port: Option<u16>,
    /// Base URL of the external image scorer service
    pub scorer_url: Option<String>,
    /// Public base URL used when building image links in responses
    pub public_base_url: Option<String>,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        tracing::info!("Root folder from command line: {}", path);
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            tracing::info!("Root folder from {}: {}", env_var_name, path);
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(config) = toml_config {
        if let Some(root_folder) = &config.root_folder {
            tracing::info!("Root folder from config file: {}", root_folder);
            return PathBuf::from(root_folder);
        }
    }

    // Priority 4: OS-dependent compiled default
    let default = default_root_folder();
    tracing::info!("Root folder defaulted to: {}", default.display());
    default
}

/// Locate the platform config file (~/.config/breathe/config.toml on Linux,
/// falling back to /etc/breathe/config.toml)
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("breathe").join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/breathe/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("breathe"))
        .unwrap_or_else(|| PathBuf::from("./breathe_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_argument_wins() {
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved =
            resolve_root_folder(Some("/from/cli"), "BREATHE_TEST_UNSET_VAR", Some(&config));
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_no_cli_or_env() {
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(None, "BREATHE_TEST_UNSET_VAR", Some(&config));
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn falls_back_to_compiled_default() {
        let resolved = resolve_root_folder(None, "BREATHE_TEST_UNSET_VAR", None);
        assert!(resolved.ends_with("breathe") || resolved.ends_with("breathe_data"));
    }

    #[test]
    fn parses_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "root_folder = \"/srv/breathe\"\nport = 5810\nscorer_url = \"http://localhost:5001\""
        )
        .unwrap();

        let config = load_toml_config(file.path()).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/breathe"));
        assert_eq!(config.port, Some(5810));
        assert_eq!(config.scorer_url.as_deref(), Some("http://localhost:5001"));
        assert!(config.public_base_url.is_none());
    }

    #[test]
    fn rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root_folder = [not toml").unwrap();

        assert!(matches!(
            load_toml_config(file.path()),
            Err(Error::Config(_))
        ));
    }
}
