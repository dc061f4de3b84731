//! Configuration and credential storage for the Qernal CLI.
//!
//! ## config.yaml
//!
//! Located at `~/.qernal/config.yaml` (or `$QERNAL_CONFIG_DIR/config.yaml`).
//! Holds a single key:
//!
//! ```yaml
//! token: clientid@clientsecret
//! ```
//!
//! ## Security
//!
//! **CRITICAL**: `config.yaml` MUST be owner-only (0600) because it contains
//! the platform credential. Looser permissions produce a warning on read.
//!
//! ## Precedence
//!
//! `QERNAL_TOKEN` > config.yaml > interactive prompt.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;
pub mod store;

pub use resolver::{
    CredentialResolver, LoginOutcome, Resolved, ResolvedCredential, ValueSource,
};
pub use schema::{
    CONFIG_DIR_MODE, CONFIG_DIR_NAME, CONFIG_FILE_MODE, CONFIG_FILE_NAME, OutputFormat,
    QERNAL_CONFIG_DIR_ENV, QERNAL_HOST_CHAOS_ENV, QERNAL_HOST_HYDRA_ENV, QERNAL_TOKEN_ENV,
    QernalConfig, Settings,
};
pub use store::{CredentialStore, PermissionCheck, StoreError, check_permissions};
