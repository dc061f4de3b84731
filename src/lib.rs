//! Qernal - command-line client for the Qernal platform.
//!
//! This library provides the core functionality for the `qernal` CLI tool:
//! credential resolution, the local credential store, sealed-box encryption
//! of secrets and the deduplicating log watcher.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod logs;
pub mod prompt;
pub mod sys;


/// Library-level error type for Qernal operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] config::StoreError),

    #[error(transparent)]
    Credential(#[from] credential::CredentialError),

    #[error(transparent)]
    Prompt(#[from] prompt::PromptError),

    #[error("encryption failed: {0}")]
    Encryption(#[from] crypto::EncryptionError),

    #[error(transparent)]
    Api(#[from] api::ApiError),

    #[error("Invalid log timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Qernal operations.
pub type Result<T> = std::result::Result<T, Error>;
