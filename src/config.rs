use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the repository root and the user config directory
pub const CONFIG_FILE_NAME: &str = "release-flow.toml";

/// Represents the complete configuration for release-flow.
///
/// Every section is optional; an absent file yields the defaults for the cargs project.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub packages: PackagesConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Identity of the released project.
///
/// Values are substituted into the file-patch registry, archive URL and package paths.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Short project name, used for the public header path (`includes/{name}.h`)
    #[serde(default = "default_name")]
    pub name: String,

    /// Package name in the Conan and vcpkg indexes
    #[serde(default = "default_package")]
    pub package: String,

    /// GitHub `owner/repo` slug
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Version macro in the public header; defaults to `{NAME}_VERSION`
    #[serde(default)]
    pub version_macro: Option<String>,
}

fn default_name() -> String {
    "cargs".to_string()
}

fn default_package() -> String {
    "libcargs".to_string()
}

fn default_repository() -> String {
    "lucocozz/cargs".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            name: default_name(),
            package: default_package(),
            repository: default_repository(),
            version_macro: None,
        }
    }
}

impl ProjectConfig {
    pub fn version_macro(&self) -> String {
        self.version_macro
            .clone()
            .unwrap_or_else(|| format!("{}_VERSION", self.name.to_uppercase()))
    }
}

/// Locations of the package-manager checkouts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PackagesConfig {
    #[serde(default)]
    pub conan_path: Option<PathBuf>,

    #[serde(default)]
    pub vcpkg_path: Option<PathBuf>,
}

impl PackagesConfig {
    /// Conan index checkout: CLI override, then config, then `~/conan-center-index`
    pub fn conan_checkout(&self, cli: Option<&Path>) -> PathBuf {
        resolve_checkout(cli, self.conan_path.as_deref(), "conan-center-index")
    }

    /// vcpkg checkout: CLI override, then config, then `~/vcpkg`
    pub fn vcpkg_checkout(&self, cli: Option<&Path>) -> PathBuf {
        resolve_checkout(cli, self.vcpkg_path.as_deref(), "vcpkg")
    }
}

fn resolve_checkout(cli: Option<&Path>, configured: Option<&Path>, dir_name: &str) -> PathBuf {
    if let Some(path) = cli.or(configured) {
        return expand_home(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(dir_name)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Timing of the archive download.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArchiveConfig {
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_grace_period() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    3
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            grace_period_secs: default_grace_period(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl ArchiveConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-flow.toml` in the repository root
/// 3. `release-flow.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed, or if it is invalid
pub fn load_config(config_path: Option<&Path>, repo_root: &Path) -> Result<Config> {
    let candidate = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if repo_root.join(CONFIG_FILE_NAME).exists() {
        Some(repo_root.join(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    };

    let Some(path) = candidate else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("Cannot parse {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(ReleaseError::config("project.name must not be empty"));
        }
        if !self.project.repository.contains('/') {
            return Err(ReleaseError::config(format!(
                "project.repository must be 'owner/repo', got '{}'",
                self.project.repository
            )));
        }
        if self.archive.max_attempts == 0 {
            return Err(ReleaseError::config("archive.max_attempts must be at least 1"));
        }
        Ok(())
    }
}
