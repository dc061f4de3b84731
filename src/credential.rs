//! The platform credential: a `clientid@clientsecret` pair.
//!
//! A [`Credential`] can only be constructed through [`Credential::parse`], so
//! holding one means the syntax check has already passed. Whether the platform
//! actually accepts it is a separate question answered by an authenticated API
//! call (see [`crate::api::ApiClient::connect`]).
//!
//! The type deliberately has no `Display` impl. `Debug` prints the masked form,
//! so a credential that ends up in a log line or panic message never leaks.

use thiserror::Error;

/// Errors produced by credential validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The string is not `clientid@clientsecret`
    #[error("invalid token format, expected format is clientid@clientsecret")]
    InvalidFormat,
}

/// A syntactically valid `clientid@clientsecret` credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    split: usize,
}

impl Credential {
    /// Validate and wrap a credential string.
    ///
    /// Accepts exactly one `@` with at least one character on each side.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CredentialError> {
        let raw = raw.into();
        let split = validate(&raw)?;
        Ok(Self { raw, split })
    }

    /// The client id (left of the `@`).
    pub fn client_id(&self) -> &str {
        &self.raw[..self.split]
    }

    /// The client secret (right of the `@`).
    pub fn client_secret(&self) -> &str {
        &self.raw[self.split + 1..]
    }

    /// The full credential string. Only hand this to the config file or the
    /// token exchange.
    pub fn expose(&self) -> &str {
        &self.raw
    }

    /// Masked form for display and logs.
    pub fn masked(&self) -> String {
        mask(&self.raw)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Check `token` against `^[^@]+@[^@]+$`, returning the byte offset of the `@`.
pub fn validate(token: &str) -> Result<usize, CredentialError> {
    let mut parts = token.match_indices('@');
    let (split, _) = parts.next().ok_or(CredentialError::InvalidFormat)?;
    if parts.next().is_some() || split == 0 || split + 1 == token.len() {
        return Err(CredentialError::InvalidFormat);
    }
    Ok(split)
}

/// Show the first and last four characters of a secret.
///
/// Short values only keep a four character prefix so that most of the secret
/// stays hidden.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4.min(chars.len() / 2)).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
