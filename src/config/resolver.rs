//! Credential precedence resolution.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. `QERNAL_TOKEN` environment variable (when set and non-empty)
//! 2. `~/.qernal/config.yaml` (`token:`)
//! 3. Interactive prompt
//!
//! The environment token is returned without touching the filesystem. A
//! prompted value is never written back; only [`CredentialResolver::login`]
//! persists a credential. Store errors other than a missing file are fatal and
//! never fall through to the prompt.

use std::path::PathBuf;

use super::schema::{QERNAL_TOKEN_ENV, Settings};
use super::store::{CredentialStore, StoreError};
use crate::Result;
use crate::credential::Credential;
use crate::prompt::{PromptRequest, SecretPrompter};

const OVERWRITE_QUESTION: &str =
    "Found an auth token, entering a new one will cause an overwrite. Continue?";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the config file
    ConfigFile(PathBuf),
    /// Value typed at the interactive prompt
    Prompt,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "file:{}", path.display()),
            ValueSource::Prompt => write!(f, "prompt"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// A resolved credential plus any advisory warnings raised on the way.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub credential: Resolved<Credential>,
    /// Permission warnings (e.g. config file readable by group)
    pub warnings: Vec<String>,
}

impl ResolvedCredential {
    pub fn value(&self) -> &Credential {
        &self.credential.value
    }

    pub fn source(&self) -> &ValueSource {
        &self.credential.source
    }

    pub fn into_credential(self) -> Credential {
        self.credential.value
    }
}

/// Result of a login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The credential that was written
    pub credential: Credential,
    /// Where the existing credential came from, if one was found
    pub previous_source: Option<ValueSource>,
    /// Whether a fresh credential was prompted for
    pub prompted: bool,
    /// Path the credential was written to
    pub path: PathBuf,
    /// Advisory warnings raised while resolving
    pub warnings: Vec<String>,
}

/// Resolves the platform credential for one invocation.
pub struct CredentialResolver<'a, P: SecretPrompter> {
    settings: &'a Settings,
    store: &'a CredentialStore,
    prompter: &'a mut P,
}

impl<'a, P: SecretPrompter> CredentialResolver<'a, P> {
    pub fn new(settings: &'a Settings, store: &'a CredentialStore, prompter: &'a mut P) -> Self {
        Self {
            settings,
            store,
            prompter,
        }
    }

    /// Resolve the credential following the precedence chain.
    ///
    /// The returned credential has passed syntactic validation.
    pub fn resolve(&mut self) -> Result<ResolvedCredential> {
        let mut warnings = Vec::new();

        let (raw, source) = if let Some(token) = &self.settings.env_token {
            (token.clone(), ValueSource::EnvVar(QERNAL_TOKEN_ENV.to_string()))
        } else {
            match self.store.read() {
                Ok(config) => {
                    if let Some(warning) = self.permission_warning() {
                        warnings.push(warning);
                    }
                    (
                        config.token,
                        ValueSource::ConfigFile(self.store.path().to_path_buf()),
                    )
                }
                Err(StoreError::NotFound(path)) => {
                    tracing::debug!(
                        path = %path.display(),
                        "no config file, prompting for credential"
                    );
                    let value = self.prompter.prompt_secret(&PromptRequest::credential())?;
                    (value, ValueSource::Prompt)
                }
                Err(e) => return Err(e.into()),
            }
        };

        let credential = Credential::parse(raw)?;
        tracing::debug!(source = %source, token = %credential.masked(), "resolved credential");
        Ok(ResolvedCredential {
            credential: Resolved::new(credential, source),
            warnings,
        })
    }

    /// Resolve, optionally replace, verify and persist a credential.
    ///
    /// When a credential already exists (env or file) the user is asked
    /// whether to overwrite it; only on "yes" is a fresh one prompted for.
    /// `verify` runs before anything is written, so a rejected credential
    /// never replaces a working one.
    pub fn login<F>(&mut self, verify: F) -> Result<LoginOutcome>
    where
        F: FnOnce(&Credential) -> Result<()>,
    {
        let (raw, previous_source, prompted, warnings) = match self.resolve_raw()? {
            (Some(existing), source, warnings) => {
                tracing::debug!(source = %source, "existing credential found");
                if self.prompter.confirm(OVERWRITE_QUESTION)? {
                    let fresh = self.prompter.prompt_secret(&PromptRequest::credential())?;
                    (fresh, Some(source), true, warnings)
                } else {
                    (existing, Some(source), false, warnings)
                }
            }
            (None, _, warnings) => {
                let fresh = self.prompter.prompt_secret(&PromptRequest::credential())?;
                (fresh, None, true, warnings)
            }
        };

        let credential = Credential::parse(raw)?;
        verify(&credential)?;
        self.store.write(&credential)?;

        Ok(LoginOutcome {
            credential,
            previous_source,
            prompted,
            path: self.store.path().to_path_buf(),
            warnings,
        })
    }

    /// Existing credential string without prompting, for login.
    fn resolve_raw(&self) -> Result<(Option<String>, ValueSource, Vec<String>)> {
        if let Some(token) = &self.settings.env_token {
            return Ok((
                Some(token.clone()),
                ValueSource::EnvVar(QERNAL_TOKEN_ENV.to_string()),
                Vec::new(),
            ));
        }
        match self.store.read() {
            Ok(config) => {
                let warnings = self.permission_warning().into_iter().collect();
                let source = ValueSource::ConfigFile(self.store.path().to_path_buf());
                let existing = Some(config.token).filter(|t| !t.is_empty());
                Ok((existing, source, warnings))
            }
            Err(StoreError::NotFound(_)) => Ok((None, ValueSource::Prompt, Vec::new())),
            Err(e) => Err(e.into()),
        }
    }

    fn permission_warning(&self) -> Option<String> {
        match self.store.check_permissions() {
            Ok(check) => check.warning(self.store.path()),
            Err(e) => {
                tracing::debug!(error = %e, "could not check config file permissions");
                None
            }
        }
    }
}
