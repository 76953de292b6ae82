use crate::identity::Role;

/// A single seed entry used to bootstrap the [`crate::ApiKeyStore`] from
/// configuration (e.g. `application.yaml`'s `setu.security.keys` list, or an
/// external provisioning call before the store supports that directly).
#[derive(Clone, Debug)]
pub struct ApiKeySeed {
    pub raw_key: String,
    pub key_id: String,
    pub tenant_id: String,
    pub role: Role,
    pub rate_class: String,
}

/// Security configuration: the header name to read and the seed keys to
/// load at startup.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Header carrying the opaque API key. Default: `X-API-Key`.
    pub api_key_header: String,
    pub seed_keys: Vec<ApiKeySeed>,
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self {
            api_key_header: "X-API-Key".to_string(),
            seed_keys: Vec::new(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    pub fn with_seed_keys(mut self, keys: Vec<ApiKeySeed>) -> Self {
        self.seed_keys = keys;
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new()
    }
}
