use anyhow::{Context, Result};
use ostreekit::PackageManagerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ostreepkg"))
}

/// Host defaults read from `config.toml`
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root the rpm database is read from
    #[serde(default)]
    pub installroot: Option<String>,
    /// Explicit rpm-ostree path
    #[serde(default)]
    pub rpm_ostree_path: Option<String>,
    /// Explicit rpm path
    #[serde(default)]
    pub rpm_path: Option<String>,
}

impl Config {
    /// Load the config file.
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = config_dir()?.join(CONFIG_FILE);
                if !path.exists() {
                    log::debug!("no config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Settings for the core, with an optional install root taking precedence.
    pub fn package_manager_config(&self, installroot: Option<&Path>) -> PackageManagerConfig {
        let install_root = installroot
            .map(Path::to_path_buf)
            .or_else(|| self.installroot.as_deref().map(expand))
            .unwrap_or_else(|| PathBuf::from("/"));

        PackageManagerConfig {
            install_root,
            rpm_ostree_binary: self.rpm_ostree_path.as_deref().map(expand),
            rpm_binary: self.rpm_path.as_deref().map(expand),
        }
    }
}

/// Expand `~` and environment variables in a configured path
fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::warn!("could not expand {path}: {e}");
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}
