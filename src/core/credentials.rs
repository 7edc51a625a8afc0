//! Credential resolution
//!
//! Turns an encrypted `api_keys` row from the credential store into the
//! in-memory key material an adapter signs with. The decrypted form lives
//! for one gateway call and is never logged.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::logging::SanitizedValue;

/// Errors raised while decrypting a stored credential
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("{field} is not valid ciphertext: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("{0} does not decrypt to UTF-8 text")]
    InvalidUtf8(&'static str),

    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("passphrase is required for this exchange")]
    MissingPassphrase,
}

/// Encrypted credential row as stored by the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCredential {
    pub exchange: String,
    #[serde(rename = "api_key")]
    pub api_key_ciphertext: String,
    #[serde(rename = "api_secret")]
    pub api_secret_ciphertext: String,
    #[serde(rename = "passphrase", default)]
    pub passphrase_ciphertext: Option<String>,
    #[serde(default)]
    pub is_testnet: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Plaintext key material for exactly one gateway call
pub struct DecryptedCredential {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl DecryptedCredential {
    /// Passphrase, or an error for exchanges that require one
    pub fn require_passphrase(&self) -> Result<&str, CredentialError> {
        self.passphrase
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(CredentialError::MissingPassphrase)
    }
}

impl fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedCredential")
            .field("api_key", &SanitizedValue::new(&self.api_key).to_string())
            .field("api_secret", &"REDACTED")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "REDACTED"))
            .finish()
    }
}

/// Decrypt a stored credential
///
/// Key and secret must decrypt to non-empty text so the signing engine never
/// sees an empty secret. An absent or blank passphrase resolves to `None`.
pub fn resolve(credential: &ExchangeCredential) -> Result<DecryptedCredential, CredentialError> {
    let api_key = decrypt_field("api_key", &credential.api_key_ciphertext)?;
    let api_secret = decrypt_field("api_secret", &credential.api_secret_ciphertext)?;
    let passphrase = match credential.passphrase_ciphertext.as_deref() {
        Some(cipher) if !cipher.trim().is_empty() => Some(decrypt_field("passphrase", cipher)?),
        _ => None,
    };

    Ok(DecryptedCredential {
        api_key,
        api_secret,
        passphrase,
    })
}

/// Reverse the store's at-rest encoding of a single field
fn decrypt_field(field: &'static str, ciphertext: &str) -> Result<String, CredentialError> {
    let bytes = BASE64_STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CredentialError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })?;
    let text = String::from_utf8(bytes).map_err(|_| CredentialError::InvalidUtf8(field))?;
    if text.trim().is_empty() {
        return Err(CredentialError::Empty(field));
    }
    Ok(text)
}
