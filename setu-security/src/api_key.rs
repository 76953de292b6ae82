//! Opaque `X-API-Key` lookup store.
//!
//! Replaces `r2e-security`'s JWT/JWKS validation with a plain keyed lookup:
//! the header value is hashed to an id and looked up directly, no signature
//! verification or remote fetch involved.

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::identity::{Principal, Role};

/// A stored API key record, keyed by the hashed key value.
#[derive(Clone, Debug)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub tenant_id: String,
    pub role: Role,
    pub rate_class: String,
    pub revoked: bool,
}

/// Thread-safe store of API key records, backed by `DashMap` in the manner
/// of `r2e-cache`'s `InMemoryStore`.
#[derive(Clone)]
pub struct ApiKeyStore {
    inner: Arc<DashMap<String, ApiKeyRecord>>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Hash a raw API key into the storage key. Keys are never stored or
    /// logged in plaintext.
    pub fn hash_key(raw: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Insert or replace a record, keyed by the raw API key.
    pub fn insert(&self, raw_key: &str, record: ApiKeyRecord) {
        self.inner.insert(Self::hash_key(raw_key), record);
    }

    pub fn revoke(&self, raw_key: &str) {
        if let Some(mut entry) = self.inner.get_mut(&Self::hash_key(raw_key)) {
            entry.revoked = true;
        }
    }

    /// Resolve a raw header value into a `Principal`, rejecting unknown or
    /// revoked keys.
    pub fn resolve(&self, raw_key: &str) -> Option<Principal> {
        let record = self.inner.get(&Self::hash_key(raw_key))?;
        if record.revoked {
            return None;
        }
        Some(Principal {
            key_id: record.key_id.clone(),
            tenant_id: record.tenant_id.clone(),
            role: record.role,
            rate_class: record.rate_class.clone(),
        })
    }
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant: &str) -> ApiKeyRecord {
        ApiKeyRecord {
            key_id: "key-1".into(),
            tenant_id: tenant.into(),
            role: Role::Analyst,
            rate_class: "default".into(),
            revoked: false,
        }
    }

    #[test]
    fn resolves_known_key() {
        let store = ApiKeyStore::new();
        store.insert("secret-abc", record("acme"));
        let principal = store.resolve("secret-abc").expect("key should resolve");
        assert_eq!(principal.tenant_id, "acme");
        assert_eq!(principal.role, Role::Analyst);
    }

    #[test]
    fn unknown_key_does_not_resolve() {
        let store = ApiKeyStore::new();
        assert!(store.resolve("nonexistent").is_none());
    }

    #[test]
    fn revoked_key_does_not_resolve() {
        let store = ApiKeyStore::new();
        store.insert("secret-abc", record("acme"));
        store.revoke("secret-abc");
        assert!(store.resolve("secret-abc").is_none());
    }

    #[test]
    fn raw_key_is_never_used_as_storage_key() {
        let store = ApiKeyStore::new();
        store.insert("secret-abc", record("acme"));
        assert!(!store.inner.contains_key("secret-abc"));
    }
}
