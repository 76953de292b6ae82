use serde::{Deserialize, Serialize};

/// Access role attached to an API key.
///
/// Ordered loosely by privilege; `Admin` bypasses row-level security per
/// the gateway's admin-bypass tenant model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Reader,
    Analyst,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The authenticated identity attached to a request, resolved from an
/// `X-API-Key` header lookup against the [`ApiKeyStore`](crate::ApiKeyStore).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    /// The API key id (not the secret itself — never logged or serialized in full).
    pub key_id: String,
    pub tenant_id: String,
    pub role: Role,
    /// Named rate-limit class (e.g. `"default"`, `"burst"`) — see `setu-rate-limit`.
    pub rate_class: String,
}

impl Principal {
    /// True if this principal is the given role, or holds `Admin` (which
    /// satisfies any role check).
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role || self.role.is_admin()
    }
}

impl setu_core::guards::Identity for Principal {
    fn sub(&self) -> &str {
        &self.key_id
    }

    fn roles(&self) -> &[String] {
        &[]
    }
}

impl crate::guards::RoleBasedIdentity for Principal {
    fn role(&self) -> Role {
        self.role
    }
}
