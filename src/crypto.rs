//! Local secret encryption.
//!
//! Secrets are encrypted on the client against the project's DEK public key
//! using an anonymous sealed box (X25519 + XSalsa20-Poly1305). Each call
//! generates a fresh ephemeral keypair whose public half is prepended to the
//! ciphertext, so only the holder of the DEK private key can open it and the
//! client cannot decrypt what it produced.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use crypto_box::PublicKey;
use crypto_box::aead::OsRng;
use thiserror::Error;

/// Length of an X25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Bytes a sealed box adds to the plaintext: ephemeral public key plus MAC.
pub const SEAL_OVERHEAD: usize = PUBLIC_KEY_LEN + 16;

/// Errors from local encryption.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The recipient key is not base64 of exactly 32 bytes
    #[error("invalid public key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The underlying cipher failed
    #[error("sealing failed")]
    Crypto,
}

/// Why a recipient key was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected 32 bytes, got {0}")]
    Length(usize),

    #[error("not valid base64 ({0})")]
    Encoding(base64::DecodeError),
}

/// Decode a base64 X25519 public key.
pub fn decode_public_key(public_key_b64: &str) -> Result<PublicKey, EncryptionError> {
    let bytes = BASE64
        .decode(public_key_b64.trim())
        .map_err(KeyError::Encoding)?;
    let key: [u8; PUBLIC_KEY_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::Length(bytes.len()))?;
    Ok(PublicKey::from(key))
}

/// Seal `plaintext` for the holder of `public_key_b64`.
///
/// Returns the base64-encoded sealed box. Identical inputs produce different
/// outputs on every call.
pub fn encrypt_local_secret(
    public_key_b64: &str,
    plaintext: &str,
) -> Result<String, EncryptionError> {
    let recipient = decode_public_key(public_key_b64)?;
    let sealed = recipient
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|_| EncryptionError::Crypto)?;
    Ok(BASE64.encode(sealed))
}

/// Encryption reference sent alongside a secret sealed with DEK `revision`.
pub fn encryption_ref(revision: i64) -> String {
    format!("keys/dek/{}", revision)
}
