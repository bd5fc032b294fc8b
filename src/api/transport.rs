//! The transport seam between the session layer and the wire.
//!
//! Everything network-bound goes through [`Transport`]: the authentication
//! exchange, tenant listing, clock sampling, and the account/container HEAD
//! requests. The session layer never touches HTTP directly, which keeps the
//! state machine testable against an in-memory transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticationMethod, Endpoint, Tenant};

use super::TransportError;

/// One authentication exchange, method-specific.
///
/// For KEYSTONE the tenant fields scope the token; the authenticator issues
/// a second, scoped request after auto-discovering a single tenant.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: AuthenticationMethod,
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
}

impl AuthRequest {
    /// Re-target this request at a discovered tenant.
    pub fn scoped_to(mut self, tenant: &Tenant) -> Self {
        self.tenant_id = Some(tenant.id.clone());
        self.tenant_name = None;
        self
    }
}

/// What a successful authentication exchange yields, independent of method.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub endpoints: Vec<Endpoint>,
    /// The tenant the token was scoped to, if any. Unscoped KEYSTONE tokens
    /// and BASIC/TEMPAUTH tokens carry none.
    pub tenant: Option<Tenant>,
}

/// Account-level usage counters reported by the storage service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub bytes_used: u64,
    pub object_count: u64,
}

/// Usage counters for a single container.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub bytes_used: u64,
    pub object_count: u64,
}

/// Synchronous (from the caller's point of view) access to the remote
/// service. Implementations own timeouts and transient-failure retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one authentication exchange.
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError>;

    /// List the tenants reachable with the given token, in service order.
    async fn list_tenants(
        &self,
        auth_url: &str,
        token: &str,
    ) -> Result<Vec<Tenant>, TransportError>;

    /// Sample the service's reported wall-clock time.
    async fn server_time(&self, url: &str) -> Result<DateTime<Utc>, TransportError>;

    /// Fetch account-level usage metadata.
    async fn account_metadata(
        &self,
        storage_url: &str,
        token: &str,
    ) -> Result<AccountMetadata, TransportError>;

    /// Fetch usage metadata for one container.
    async fn container_info(
        &self,
        storage_url: &str,
        token: &str,
        name: &str,
    ) -> Result<ContainerInfo, TransportError>;
}
