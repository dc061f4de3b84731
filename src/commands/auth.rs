//! `qernal auth` commands.

use std::path::PathBuf;

use serde::Serialize;

use super::{CommandResult, json_of, print_warnings};
use crate::Result;
use crate::api::ApiClient;
use crate::config::{CredentialResolver, Settings, ValueSource};
use crate::credential::Credential;
use crate::prompt::SecretPrompter;

/// Result of `auth login`.
#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub path: PathBuf,
    /// Masked credential that was stored
    pub token: String,
    /// Where the previous credential came from, if any
    pub previous_source: Option<String>,
    /// Whether a new credential was entered
    pub replaced: bool,
    /// Whether the credential was checked against the platform
    pub verified: bool,
}

impl CommandResult for LoginResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Saved credential {} to {}",
            self.token,
            self.path.display()
        )];
        if !self.verified {
            lines.push("Credential was not verified against the platform".to_string());
        }
        lines.join("\n")
    }
}

/// Result of `auth check`.
#[derive(Debug, Serialize)]
pub struct AuthCheck {
    pub token: String,
    pub source: String,
    pub organisations: usize,
}

impl CommandResult for AuthCheck {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Credential {} ({}) is valid, {} organisation(s) visible",
            self.token, self.source, self.organisations
        )
    }
}

/// Result of `auth logout`.
#[derive(Serialize)]
pub struct LogoutResult {
    pub path: PathBuf,
    pub removed: bool,
}

impl CommandResult for LogoutResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.removed {
            format!("Removed {}", self.path.display())
        } else {
            format!("No stored credential at {}", self.path.display())
        }
    }
}

/// Confirm the platform accepts `credential` with one authenticated call.
pub fn verify_remote(settings: &Settings, credential: &Credential) -> Result<usize> {
    let client = ApiClient::connect(settings, credential)?;
    let orgs = client.list_organisations()?;
    tracing::debug!(organisations = orgs.len(), "credential verified");
    Ok(orgs.len())
}

/// Store a credential, asking before replacing an existing one.
pub fn login<P: SecretPrompter>(
    settings: &Settings,
    prompter: &mut P,
    verify: bool,
) -> Result<LoginResult> {
    let store = settings.store();
    let outcome = CredentialResolver::new(settings, &store, prompter).login(|credential| {
        if verify {
            verify_remote(settings, credential)?;
        }
        Ok(())
    })?;
    print_warnings(&outcome.warnings);

    Ok(LoginResult {
        path: outcome.path,
        token: outcome.credential.masked(),
        previous_source: outcome.previous_source.as_ref().map(ValueSource::to_string),
        replaced: outcome.prompted,
        verified: verify,
    })
}

/// Validate a credential (given or resolved) and verify it remotely.
pub fn check<P: SecretPrompter>(
    settings: &Settings,
    prompter: &mut P,
    token: Option<String>,
) -> Result<AuthCheck> {
    let (credential, source) = match token {
        Some(raw) => (Credential::parse(raw)?, "argument".to_string()),
        None => {
            let store = settings.store();
            let resolved = CredentialResolver::new(settings, &store, prompter).resolve()?;
            print_warnings(&resolved.warnings);
            let source = resolved.source().to_string();
            (resolved.into_credential(), source)
        }
    };

    let organisations = verify_remote(settings, &credential)?;
    Ok(AuthCheck {
        token: credential.masked(),
        source,
        organisations,
    })
}

/// Remove the stored credential.
pub fn logout(settings: &Settings) -> Result<LogoutResult> {
    let store = settings.store();
    let removed = store.remove()?;
    Ok(LogoutResult {
        path: settings.config_path.clone(),
        removed,
    })
}
