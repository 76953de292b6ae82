use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::{VaultError, VaultKey};

const KEY_ENV_VAR: &str = "SETU_VAULT_KEY";

/// Vault configuration: a single AES-256 key, base64-encoded, sourced from
/// the environment only. Never accepted from a YAML config file — the vault
/// key is the one secret that must not round-trip through a config dump.
#[derive(Clone)]
pub struct VaultConfig {
    key: VaultKey,
}

impl VaultConfig {
    /// Build from an already-decoded 32-byte key. Mainly for tests.
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        Ok(Self {
            key: VaultKey::from_bytes(bytes)?,
        })
    }

    /// Load `SETU_VAULT_KEY` from the environment as base64 and construct
    /// the vault key. Required: there is no default key.
    pub fn from_env() -> Result<Self, VaultError> {
        let encoded = std::env::var(KEY_ENV_VAR).map_err(|_| VaultError::MissingKey)?;
        let bytes = BASE64.decode(encoded.trim()).map_err(|_| VaultError::InvalidEncoding)?;
        Self::from_key_bytes(&bytes)
    }

    pub fn key(&self) -> &VaultKey {
        &self.key
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig").field("key", &"<redacted>").finish()
    }
}
