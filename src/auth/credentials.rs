use serde::{Deserialize, Serialize};

/// How the account proves its identity to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthenticationMethod {
    /// Authenticate against the storage service itself with HTTP basic auth.
    Basic,
    /// Authenticate against the storage service itself with the legacy
    /// `X-Storage-User`/`X-Storage-Pass` header exchange.
    TempAuth,
    /// Authenticate against a Keystone identity service. Ideally a tenant id
    /// or name is supplied; with neither, the tenant is auto-discovered when
    /// the credentials reach exactly one.
    #[default]
    Keystone,
}

/// The credential bundle an [`Account`](crate::Account) is built from.
///
/// Immutable once the account exists; runtime-tunable knobs (host overrides,
/// reauthentication, caching) live on the account itself. Construct with
/// [`AccountConfig::new`] and refine with the `with_*` updates.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
    pub auth_url: String,
    pub method: AuthenticationMethod,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    /// Picks the object-store endpoint when the catalog spans regions.
    /// Unset means the first applicable endpoint wins.
    pub preferred_region: Option<String>,
    /// Seed for server-side hash generation (temp URLs). Also settable later
    /// on the account.
    pub hash_password: Option<String>,
}

impl AccountConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_url: impl Into<String>,
        method: AuthenticationMethod,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            auth_url: auth_url.into(),
            method,
            tenant_id: None,
            tenant_name: None,
            preferred_region: None,
            hash_password: None,
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_tenant_name(mut self, tenant_name: impl Into<String>) -> Self {
        self.tenant_name = Some(tenant_name.into());
        self
    }

    pub fn with_preferred_region(mut self, region: impl Into<String>) -> Self {
        self.preferred_region = Some(region.into());
        self
    }

    pub fn with_hash_password(mut self, hash_password: impl Into<String>) -> Self {
        self.hash_password = Some(hash_password.into());
        self
    }

    /// Whether a tenant id and/or name were supplied. Supplying one does not
    /// guarantee resolution succeeds, only that discovery is skipped.
    pub fn is_tenant_supplied(&self) -> bool {
        self.tenant_id.is_some() || self.tenant_name.is_some()
    }
}
