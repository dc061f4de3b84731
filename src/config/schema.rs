//! Schema definitions for `config.yaml` and the per-invocation settings.
//!
//! This module provides:
//! - the serde struct for the stored configuration file
//! - file name and permission constants
//! - the [`OutputFormat`] preference
//! - [`Settings`], built once per invocation from the process environment

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::store::CredentialStore;
use crate::sys::SudoContext;

/// Environment variable that overrides every other credential source.
pub const QERNAL_TOKEN_ENV: &str = "QERNAL_TOKEN";

/// Environment variable that overrides the config directory (`~/.qernal`).
pub const QERNAL_CONFIG_DIR_ENV: &str = "QERNAL_CONFIG_DIR";

/// Environment variable for the OAuth host.
pub const QERNAL_HOST_HYDRA_ENV: &str = "QERNAL_HOST_HYDRA";

/// Environment variable for the API host.
pub const QERNAL_HOST_CHAOS_ENV: &str = "QERNAL_HOST_CHAOS";

pub const DEFAULT_HYDRA_HOST: &str = "https://hydra.qernal.com";
pub const DEFAULT_CHAOS_HOST: &str = "https://chaos.qernal.com";

/// Directory under the user's home holding the config file.
pub const CONFIG_DIR_NAME: &str = ".qernal";

/// Name of the config file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// File permission mode for config.yaml (owner read/write only).
/// This file contains the platform credential.
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Permission mode for the config directory.
pub const CONFIG_DIR_MODE: u32 = 0o700;

/// Default HTTP timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Text,
    /// JSON output (machine-readable)
    Json,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Contents of `~/.qernal/config.yaml`.
///
/// ```yaml
/// token: clientid@clientsecret
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QernalConfig {
    /// The stored credential, unvalidated as read from disk
    #[serde(default)]
    pub token: String,
}

impl std::fmt::Debug for QernalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QernalConfig")
            .field("token", &crate::credential::mask(&self.token))
            .finish()
    }
}

impl QernalConfig {
    /// Parse the YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Per-invocation settings.
///
/// Built once in `main` and passed down by reference; nothing below the
/// command layer reads `QERNAL_*` or `SUDO_*` variables directly. The only
/// other environment input is the `HOME` fallback inside `dirs`.
#[derive(Clone)]
pub struct Settings {
    /// Full path to the config file
    pub config_path: PathBuf,
    /// Value of `QERNAL_TOKEN`, when set and non-empty
    pub env_token: Option<String>,
    /// OAuth host (token exchange)
    pub hydra_host: String,
    /// API host
    pub chaos_host: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Invoking user when running as root through sudo
    pub sudo: Option<SudoContext>,
}

impl Settings {
    /// Build settings from the process environment.
    ///
    /// The config directory is `QERNAL_CONFIG_DIR` if set, otherwise
    /// `~/.qernal` under the invoking user's home (see [`crate::sys::home_dir`]).
    /// The sudo variables are read through the same lookup.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let sudo = crate::sys::detect_sudo_context(&lookup);

        let config_dir = match non_empty(QERNAL_CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => crate::sys::home_dir(sudo.as_ref())
                .ok_or_else(|| crate::Error::Other("cannot determine home directory".into()))?
                .join(CONFIG_DIR_NAME),
        };

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            env_token: non_empty(QERNAL_TOKEN_ENV),
            hydra_host: non_empty(QERNAL_HOST_HYDRA_ENV)
                .unwrap_or_else(|| DEFAULT_HYDRA_HOST.to_string()),
            chaos_host: non_empty(QERNAL_HOST_CHAOS_ENV)
                .unwrap_or_else(|| DEFAULT_CHAOS_HOST.to_string()),
            timeout: DEFAULT_TIMEOUT,
            sudo,
        })
    }

    /// Credential store at the configured path, owned by the sudo invoker
    /// when there is one.
    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(&self.config_path).with_owner(self.sudo.clone())
    }

    /// Base URL of the versioned REST API.
    pub fn api_base(&self) -> String {
        format!("{}/v1", self.chaos_host.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("config_path", &self.config_path)
            .field(
                "env_token",
                &self.env_token.as_deref().map(crate::credential::mask),
            )
            .field("hydra_host", &self.hydra_host)
            .field("chaos_host", &self.chaos_host)
            .field("timeout", &self.timeout)
            .field("sudo", &self.sudo)
            .finish()
    }
}
