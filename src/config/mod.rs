// ABOUTME: Configuration types and parsing for ocirootfs.yml.
// ABOUTME: Handles YAML parsing, env var interpolation for credentials, and defaults.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::process::DEFAULT_COMMAND_TIMEOUT;
use crate::rootfs::{DEFAULT_CONTAINER_PREFIX, ManagerSettings};
use crate::sizing::SizeSpec;
use crate::types::Credentials;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "ocirootfs.yml";
pub const CONFIG_FILENAME_ALT: &str = "ocirootfs.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".ocirootfs/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Parent directory for the temp workspace.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Colon-separated directories searched for host tools instead of `$PATH`.
    #[serde(default)]
    pub search_path: Option<String>,

    /// Force a backend instead of auto-detecting one.
    #[serde(default)]
    pub backend: Option<BackendKind>,

    #[serde(default = "default_fallback_size_mib")]
    pub fallback_size_mib: u64,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// Registry credentials, usually pulled from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: EnvValue,
    pub password: EnvValue,
}

impl AuthConfig {
    pub fn resolve(&self) -> Result<Credentials> {
        Ok(Credentials::new(
            self.username.resolve()?,
            self.password.resolve()?,
        ))
    }
}

fn default_fallback_size_mib() -> u64 {
    1024
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

fn default_container_prefix() -> String {
    DEFAULT_CONTAINER_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: None,
            search_path: None,
            backend: None,
            fallback_size_mib: default_fallback_size_mib(),
            command_timeout: default_command_timeout(),
            container_prefix: default_container_prefix(),
            auth: None,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file deserializes as null; treat it as all defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_yaml(&content)
    }

    /// First config file found in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the config file in `dir`, or the built-in defaults if there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.fallback_size_mib == 0 {
            return Err(Error::InvalidConfig(
                "fallback_size_mib must be greater than zero".to_string(),
            ));
        }
        if self.fallback_size_mib > SizeSpec::MAX_MIB {
            return Err(Error::InvalidConfig(format!(
                "fallback_size_mib must be at most {}",
                SizeSpec::MAX_MIB
            )));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "command_timeout must be greater than zero".to_string(),
            ));
        }
        if self.container_prefix.is_empty()
            || !self
                .container_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(Error::InvalidConfig(format!(
                "container_prefix {:?} must be non-empty and use only [A-Za-z0-9_.-]",
                self.container_prefix
            )));
        }
        Ok(())
    }

    /// Credentials from the `auth` section, if present.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        self.auth.as_ref().map(AuthConfig::resolve).transpose()
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            work_dir: self.work_dir.clone(),
            search_path: self.search_path.as_ref().map(OsString::from),
            backend: self.backend,
            fallback_size: SizeSpec::from_mib(self.fallback_size_mib),
            command_timeout: self.command_timeout,
            container_prefix: self.container_prefix.clone(),
        }
    }
}
