//! Method-specific authentication flows.
//!
//! BASIC and TEMPAUTH are a single exchange. KEYSTONE may take up to three
//! calls: an unscoped pass, a tenant listing, and a second pass scoped to an
//! auto-discovered tenant. Each flow is pure request/response logic; all
//! session state stays with the caller.

use tracing::{debug, warn};

use crate::account::CallCounter;
use crate::api::{AuthRequest, SwiftError, Transport};

use super::{AccessToken, AccountConfig, AuthenticationMethod, Tenant};

/// Result of one authentication run.
#[derive(Debug)]
pub(crate) enum AuthOutcome {
    Authenticated(AccessToken),
    /// Keystone reached zero or multiple tenants with none supplied. The
    /// unscoped token still authorizes tenant listing.
    TenantUnresolved {
        unscoped: AccessToken,
        candidates: Vec<Tenant>,
    },
}

fn request_for(config: &AccountConfig) -> AuthRequest {
    AuthRequest {
        method: config.method,
        auth_url: config.auth_url.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        tenant_id: config.tenant_id.clone(),
        tenant_name: config.tenant_name.clone(),
    }
}

/// Run the authentication flow for the configured method. Every outbound
/// call increments the counter, failed ones included.
pub(crate) async fn run(
    transport: &dyn Transport,
    config: &AccountConfig,
    calls: &CallCounter,
) -> Result<AuthOutcome, SwiftError> {
    match config.method {
        AuthenticationMethod::Basic | AuthenticationMethod::TempAuth => {
            calls.increment();
            let response = transport
                .authenticate(&request_for(config))
                .await
                .map_err(SwiftError::AuthenticationFailed)?;
            debug!(method = ?config.method, "Authenticated");
            Ok(AuthOutcome::Authenticated(AccessToken::from_response(response)))
        }
        AuthenticationMethod::Keystone => authenticate_keystone(transport, config, calls).await,
    }
}

async fn authenticate_keystone(
    transport: &dyn Transport,
    config: &AccountConfig,
    calls: &CallCounter,
) -> Result<AuthOutcome, SwiftError> {
    calls.increment();
    let response = transport
        .authenticate(&request_for(config))
        .await
        .map_err(SwiftError::AuthenticationFailed)?;
    let access = AccessToken::from_response(response);

    // A supplied tenant, or a token the service already scoped, ends the flow.
    if config.is_tenant_supplied() || access.tenant().is_some() {
        debug!(tenant = ?access.tenant().map(|t| t.id.as_str()), "Keystone authenticated");
        return Ok(AuthOutcome::Authenticated(access));
    }

    calls.increment();
    let tenants = transport
        .list_tenants(&config.auth_url, access.token())
        .await
        .map_err(SwiftError::AuthenticationFailed)?;

    if tenants.len() == 1 {
        let tenant = &tenants[0];
        debug!(tenant_id = %tenant.id, tenant_name = %tenant.name,
               "Auto-discovered single tenant, re-authenticating scoped");
        calls.increment();
        let response = transport
            .authenticate(&request_for(config).scoped_to(tenant))
            .await
            .map_err(SwiftError::AuthenticationFailed)?;
        Ok(AuthOutcome::Authenticated(AccessToken::from_response(response)))
    } else {
        warn!(count = tenants.len(),
              "Tenant auto-discovery failed, account limited to tenant listing");
        Ok(AuthOutcome::TenantUnresolved {
            unscoped: access,
            candidates: tenants,
        })
    }
}
