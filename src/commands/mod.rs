//! Command implementations for the Qernal CLI.
//!
//! This module contains the business logic for each CLI command.
//! Commands are organized by area:
//! - `auth` - login, check, logout
//! - `secrets` - local encryption and secret creation
//! - `functions` - function logs (single fetch and watch)

pub mod auth;
pub mod functions;
pub mod secrets;

use std::io::Read;

use serde::Serialize;

use crate::api::ApiClient;
use crate::config::{CredentialResolver, Settings};
use crate::prompt::SecretPrompter;
use crate::{Error, Result};

pub use auth::{AuthCheck, LoginResult, LogoutResult};
pub use functions::LogsResult;
pub use secrets::{EncryptResult, ProjectRef, SecretCreated, SecretInput};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a result, falling back to an error object.
pub(crate) fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "failed to serialize output: {}"}}"#, e))
}

/// Print advisory warnings to stderr.
pub(crate) fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}

/// Resolve the credential and open an authenticated API client.
pub fn connect<P: SecretPrompter>(settings: &Settings, prompter: &mut P) -> Result<ApiClient> {
    let store = settings.store();
    let resolved = CredentialResolver::new(settings, &store, prompter).resolve()?;
    print_warnings(&resolved.warnings);
    let client = ApiClient::connect(settings, resolved.value())?;
    Ok(client)
}

/// Read a secret value from `reader`, dropping one trailing newline.
pub fn read_secret_value<R: Read>(reader: &mut R) -> Result<String> {
    let mut value = String::new();
    reader.read_to_string(&mut value)?;
    if let Some(stripped) = value.strip_suffix('\n') {
        value = stripped.strip_suffix('\r').unwrap_or(stripped).to_string();
    }
    if value.is_empty() {
        return Err(Error::InvalidInput(
            "no secret value provided on stdin".to_string(),
        ));
    }
    Ok(value)
}

/// Build information for `qernal version`.
#[derive(Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub commit: String,
    pub build_timestamp: String,
}

impl CommandResult for VersionInfo {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "qernal {} ({}, built {})",
            self.version, self.commit, self.build_timestamp
        )
    }
}

/// Report the CLI version.
pub fn version() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("QERNAL_GIT_COMMIT").to_string(),
        build_timestamp: env!("QERNAL_BUILD_TIMESTAMP").to_string(),
    }
}
