// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AtdError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection parameters for one appliance.
#[derive(Debug, Clone)]
pub struct ApplianceConfig {
    pub host: String,
    pub skip_tls: bool,
    pub timeout: Duration,
}

impl ApplianceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            skip_tls: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Base URL of the appliance. A bare host or IP is reached over HTTPS.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

/// Login credentials. The password is always resolved before connecting.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Delays used by the two polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub status_initial: Duration,
    pub status_step: Duration,
    pub status_max: Duration,
    pub report_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_initial: Duration::from_secs(5),
            status_step: Duration::from_secs(5),
            status_max: Duration::from_secs(30),
            report_interval: Duration::from_secs(30),
        }
    }
}

/// Optional settings read from a TOML file.
///
/// ```toml
/// host = "10.0.0.5"
/// user = "analyst"
/// skip_tls = true
/// profile = "24"
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub skip_tls: Option<bool>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load a config file that the user asked for explicitly.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load `<config_dir>/atd-submit/config.toml` if it exists.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("atd-submit").join("config.toml"))
    }
}

/// Values given on the command line or through `ATD_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// `None` when neither the flag nor `ATD_SKIP_TLS` was given.
    pub skip_tls: Option<bool>,
    pub profile: Option<String>,
    pub sample: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub list_profiles: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Submit { sample: PathBuf, profile: String },
    ListProfiles,
}

/// Fully merged settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub appliance: ApplianceConfig,
    pub user: String,
    pub password: Option<String>,
    pub mode: Mode,
}

impl Settings {
    /// Merge overrides on top of the file config.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let host = overrides
            .host
            .or(file.host)
            .ok_or_else(|| AtdError::Config("appliance host is required (--atd-ip or ATD_HOST)".to_string()))?;
        let user = overrides
            .user
            .or(file.user)
            .ok_or_else(|| AtdError::Config("user name is required (--user or ATD_USER)".to_string()))?;

        let mode = if overrides.list_profiles {
            Mode::ListProfiles
        } else {
            let sample = overrides
                .sample
                .ok_or_else(|| AtdError::Config("a file to upload is required (--sample)".to_string()))?;
            let profile = overrides.profile.or(file.profile).ok_or_else(|| {
                AtdError::Config("an analyzer profile is required (--profile or ATD_PROFILE)".to_string())
            })?;
            Mode::Submit { sample, profile }
        };

        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Settings {
            appliance: ApplianceConfig {
                host,
                skip_tls: overrides.skip_tls.or(file.skip_tls).unwrap_or(false),
                timeout: Duration::from_secs(timeout_secs),
            },
            user,
            password: overrides.password.or(file.password),
            mode,
        })
    }
}
