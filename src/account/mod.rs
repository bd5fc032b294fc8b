//! The account session: authentication lifecycle, call accounting, clock
//! skew, metadata, and the container cache.
//!
//! An [`Account`] owns one credential set and orchestrates the method
//! dispatch in [`crate::auth::authenticator`]. Operations that need a valid
//! token check expiry against the clock-adjusted time and, when
//! reauthentication is allowed, refresh transparently. The token state sits
//! behind an async mutex held across the exchange, so concurrent callers
//! observing an expired token trigger a single refresh and share its result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{AccountMetadata, SwiftError, Transport, TransportError};
use crate::auth::authenticator::{self, AuthOutcome};
use crate::auth::{AccessToken, AccountConfig, Tenant};
use crate::cache::{Container, ContainerCache};
use crate::clock::ClockReference;

/// Counts outbound calls to the remote service. Monotonic, incremented once
/// per call whether it succeeds or fails.
#[derive(Debug, Default)]
pub struct CallCounter(AtomicU64);

impl CallCounter {
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Authentication lifecycle of the account.
#[derive(Debug)]
enum AuthState {
    Unauthenticated,
    Authenticated(AccessToken),
    /// Keystone could not settle on a tenant; the unscoped token only
    /// authorizes tenant listing.
    TenantUnresolved { unscoped: AccessToken },
}

/// Runtime-tunable knobs. Changing these never invalidates an obtained
/// token and never resets the call counter.
#[derive(Debug, Default)]
struct Settings {
    public_host: Option<String>,
    private_host: Option<String>,
    hash_password: Option<String>,
}

/// One authenticated session against the object-storage service.
///
/// All state is scoped to the instance; share it behind an `Arc` if needed.
pub struct Account {
    transport: Arc<dyn Transport>,
    config: AccountConfig,
    original_host: String,
    settings: RwLock<Settings>,
    allow_reauthenticate: AtomicBool,
    container_caching: AtomicBool,
    state: Mutex<AuthState>,
    clock: ClockReference,
    calls: CallCounter,
    metadata: Mutex<Option<AccountMetadata>>,
    cache: ContainerCache,
}

impl Account {
    /// Build an account from its credential set. No network activity happens
    /// here; authentication is triggered on first use or explicitly.
    pub fn new(config: AccountConfig, transport: Arc<dyn Transport>) -> Result<Self, SwiftError> {
        let parsed = Url::parse(&config.auth_url)
            .map_err(|e| SwiftError::InvalidConfig(format!("auth URL: {e}")))?;
        let original_host = parsed
            .host_str()
            .ok_or_else(|| SwiftError::InvalidConfig("auth URL has no host".to_string()))?
            .to_string();

        let settings = Settings {
            hash_password: config.hash_password.clone(),
            ..Settings::default()
        };

        Ok(Self {
            transport,
            config,
            original_host,
            settings: RwLock::new(settings),
            allow_reauthenticate: AtomicBool::new(true),
            container_caching: AtomicBool::new(false),
            state: Mutex::new(AuthState::Unauthenticated),
            clock: ClockReference::new(),
            calls: CallCounter::default(),
            metadata: Mutex::new(None),
            cache: ContainerCache::new(),
        })
    }

    // ===== Authentication =====

    /// Trigger authentication, or return the current token if it is still
    /// valid (no network call on that fast path).
    ///
    /// When Keystone tenant discovery fails, the account drops to list-only
    /// mode and the unscoped token is returned; data operations will fail
    /// with [`SwiftError::TenantUnresolved`] until a tenant is supplied.
    /// On failure the previous state is kept; no partial token is stored.
    pub async fn authenticate(&self) -> Result<AccessToken, SwiftError> {
        let mut state = self.state.lock().await;
        if let AuthState::Authenticated(access) = &*state {
            if access.valid_at(self.clock.now()) {
                return Ok(access.clone());
            }
        }
        self.authenticate_locked(&mut state).await
    }

    /// Run the authenticator while holding the state lock.
    async fn authenticate_locked(&self, state: &mut AuthState) -> Result<AccessToken, SwiftError> {
        let outcome = authenticator::run(self.transport.as_ref(), &self.config, &self.calls).await?;
        match outcome {
            AuthOutcome::Authenticated(access) => {
                *state = AuthState::Authenticated(access.clone());
                Ok(access)
            }
            AuthOutcome::TenantUnresolved { unscoped, candidates } => {
                debug!(candidates = candidates.len(), "Entering list-only mode");
                let token = unscoped.clone();
                *state = AuthState::TenantUnresolved { unscoped };
                Ok(token)
            }
        }
    }

    /// A token fit for data operations: authenticated, tenant resolved, and
    /// valid at the adjusted clock. First use authenticates unconditionally;
    /// an expired token refreshes only if reauthentication is allowed.
    async fn scoped_access(&self) -> Result<AccessToken, SwiftError> {
        let mut state = self.state.lock().await;
        match &*state {
            AuthState::Authenticated(access) if access.valid_at(self.clock.now()) => {
                return Ok(access.clone());
            }
            AuthState::Authenticated(_) => {
                if !self.is_allow_reauthenticate() {
                    return Err(SwiftError::SessionExpired);
                }
                debug!("Access token expired, reauthenticating");
            }
            AuthState::TenantUnresolved { .. } => return Err(SwiftError::TenantUnresolved),
            AuthState::Unauthenticated => {}
        }
        self.authenticate_locked(&mut state).await?;
        match &*state {
            AuthState::Authenticated(access) => Ok(access.clone()),
            _ => Err(SwiftError::TenantUnresolved),
        }
    }

    /// Like [`Self::scoped_access`] but also usable in list-only mode, for
    /// the one operation that works there (tenant listing).
    async fn any_access(&self) -> Result<AccessToken, SwiftError> {
        let mut state = self.state.lock().await;
        let current = match &*state {
            AuthState::Authenticated(access) => Some(access),
            AuthState::TenantUnresolved { unscoped } => Some(unscoped),
            AuthState::Unauthenticated => None,
        };
        if let Some(access) = current {
            if access.valid_at(self.clock.now()) {
                return Ok(access.clone());
            }
            if !self.is_allow_reauthenticate() {
                return Err(SwiftError::SessionExpired);
            }
        }
        self.authenticate_locked(&mut state).await
    }

    /// Refresh after the remote rejected `stale`. If another caller already
    /// replaced the token, reuse theirs instead of a second exchange.
    async fn reauthenticate_after_rejection(
        &self,
        stale: &str,
        require_tenant: bool,
    ) -> Result<AccessToken, SwiftError> {
        let mut state = self.state.lock().await;
        let current = match &*state {
            AuthState::Authenticated(access) => Some(access),
            AuthState::TenantUnresolved { unscoped } if !require_tenant => Some(unscoped),
            _ => None,
        };
        if let Some(access) = current {
            if access.token() != stale && access.valid_at(self.clock.now()) {
                return Ok(access.clone());
            }
        }
        let access = self.authenticate_locked(&mut state).await?;
        if require_tenant && !matches!(&*state, AuthState::Authenticated(_)) {
            return Err(SwiftError::TenantUnresolved);
        }
        Ok(access)
    }

    // ===== Account metadata =====

    /// Force a refresh of the account metadata (bytes used, object count).
    /// Leaves the token state and container cache untouched.
    pub async fn reload(&self) -> Result<(), SwiftError> {
        let fetched = self.fetch_metadata().await?;
        *self.metadata.lock().await = Some(fetched);
        Ok(())
    }

    /// The number of bytes stored across all containers of the account,
    /// loading the metadata once if it was never fetched.
    pub async fn bytes_used(&self) -> Result<u64, SwiftError> {
        let mut metadata = self.metadata.lock().await;
        if let Some(meta) = metadata.as_ref() {
            return Ok(meta.bytes_used);
        }
        let fetched = self.fetch_metadata().await?;
        let bytes = fetched.bytes_used;
        *metadata = Some(fetched);
        Ok(bytes)
    }

    /// The number of stored objects across all containers of the account,
    /// loading the metadata once if it was never fetched.
    pub async fn object_count(&self) -> Result<u64, SwiftError> {
        let mut metadata = self.metadata.lock().await;
        if let Some(meta) = metadata.as_ref() {
            return Ok(meta.object_count);
        }
        let fetched = self.fetch_metadata().await?;
        let count = fetched.object_count;
        *metadata = Some(fetched);
        Ok(count)
    }

    async fn fetch_metadata(&self) -> Result<AccountMetadata, SwiftError> {
        let access = self.scoped_access().await?;
        let url = self.resolve_storage_url(&access, false)?;
        self.calls.increment();
        match self.transport.account_metadata(&url, access.token()).await {
            Ok(meta) => Ok(meta),
            Err(e) if e.is_unauthorized() && self.is_allow_reauthenticate() => {
                let access = self
                    .reauthenticate_after_rejection(access.token(), true)
                    .await?;
                let url = self.resolve_storage_url(&access, false)?;
                self.calls.increment();
                self.transport
                    .account_metadata(&url, access.token())
                    .await
                    .map_err(Into::into)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ===== Server time =====

    /// Sample the service clock once and store the new offset, replacing any
    /// previous one.
    pub async fn synchronize_with_server_time(&self) -> Result<(), SwiftError> {
        self.calls.increment();
        let server_time = self.transport.server_time(&self.config.auth_url).await?;
        self.clock.observe(server_time);
        debug!(offset_ms = self.clock.offset_ms(), "Synchronized with server time");
        Ok(())
    }

    /// Server time in milliseconds since the epoch: local time adjusted by
    /// the stored offset, no network call. Plain local time until the first
    /// [`Self::synchronize_with_server_time`].
    pub fn server_time_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Server time in seconds, `seconds` into the future. Pure function of
    /// the stored offset.
    pub fn actual_server_time_in_seconds(&self, seconds: i64) -> i64 {
        self.server_time_millis() / 1000 + seconds
    }

    // ===== Tenants =====

    /// List the tenants reachable with these credentials. This is the one
    /// data operation that also works in list-only mode.
    pub async fn tenants(&self) -> Result<Vec<Tenant>, SwiftError> {
        let access = self.any_access().await?;
        self.calls.increment();
        match self
            .transport
            .list_tenants(&self.config.auth_url, access.token())
            .await
        {
            Ok(tenants) => Ok(tenants),
            Err(e) if e.is_unauthorized() && self.is_allow_reauthenticate() => {
                let access = self
                    .reauthenticate_after_rejection(access.token(), false)
                    .await?;
                self.calls.increment();
                self.transport
                    .list_tenants(&self.config.auth_url, access.token())
                    .await
                    .map_err(Into::into)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a tenant id and/or name were supplied with the credentials.
    pub fn is_tenant_supplied(&self) -> bool {
        self.config.is_tenant_supplied()
    }

    // ===== Containers =====

    /// Resolve a container handle, consulting the cache when container
    /// caching is enabled. With caching disabled every lookup resolves
    /// fresh, even if entries from an earlier enabled period still exist.
    pub async fn container(&self, name: &str) -> Result<Container, SwiftError> {
        if self.container_caching.load(Ordering::Relaxed) {
            self.cache
                .get_or_resolve(name, || self.resolve_container(name))
                .await
        } else {
            self.resolve_container(name).await
        }
    }

    /// Empty the container cache, regardless of the caching flag.
    pub fn reset_container_cache(&self) {
        self.cache.reset();
    }

    async fn resolve_container(&self, name: &str) -> Result<Container, SwiftError> {
        let access = self.scoped_access().await?;
        let url = self.resolve_storage_url(&access, false)?;
        self.calls.increment();
        let info = match self.transport.container_info(&url, access.token(), name).await {
            Ok(info) => info,
            Err(e) if e.is_unauthorized() && self.is_allow_reauthenticate() => {
                let access = self
                    .reauthenticate_after_rejection(access.token(), true)
                    .await?;
                let url = self.resolve_storage_url(&access, false)?;
                self.calls.increment();
                self.transport
                    .container_info(&url, access.token(), name)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Container {
            name: name.to_string(),
            bytes_used: info.bytes_used,
            object_count: info.object_count,
        })
    }

    // ===== Endpoints and hosts =====

    /// The object-store URL the current token authorizes, honoring the
    /// preferred region and the public/private host overrides.
    pub async fn storage_url(&self, internal: bool) -> Result<String, SwiftError> {
        let access = self.scoped_access().await?;
        self.resolve_storage_url(&access, internal)
    }

    fn resolve_storage_url(
        &self,
        access: &AccessToken,
        internal: bool,
    ) -> Result<String, SwiftError> {
        let endpoint = access
            .catalog()
            .storage_endpoint(self.config.preferred_region.as_deref())
            .ok_or_else(|| {
                TransportError::InvalidResponse(
                    "no object-store endpoint in service catalog".to_string(),
                )
            })?;
        let base = if internal {
            endpoint.internal_url.as_deref().unwrap_or(&endpoint.public_url)
        } else {
            &endpoint.public_url
        };
        let override_host = {
            let settings = self.settings.read();
            if internal {
                settings.private_host.clone()
            } else {
                settings.public_host.clone()
            }
        };
        match override_host {
            Some(host) => rewrite_host(base, &host),
            None => Ok(base.to_string()),
        }
    }

    /// Host of the authentication URL, unaffected by the public/private host
    /// overrides. Diagnostic use.
    pub fn original_host(&self) -> &str {
        &self.original_host
    }

    // ===== Configuration =====

    /// Allow or forbid transparent reauthentication when the token expires.
    /// Off is recommended when the caller wants to control the exchange, for
    /// instance in long-living web processes.
    pub fn set_allow_reauthenticate(&self, allow: bool) {
        self.allow_reauthenticate.store(allow, Ordering::Relaxed);
    }

    pub fn is_allow_reauthenticate(&self) -> bool {
        self.allow_reauthenticate.load(Ordering::Relaxed)
    }

    /// Override the host used to address objects publicly.
    pub fn set_public_host(&self, host: impl Into<String>) {
        self.settings.write().public_host = Some(host.into());
    }

    /// Override the host used to address objects on the internal network.
    pub fn set_private_host(&self, host: impl Into<String>) {
        self.settings.write().private_host = Some(host.into());
    }

    /// Enable or disable container caching. Disabling does not clear the
    /// cache; it stops consulting it entirely.
    pub fn set_allow_container_caching(&self, caching: bool) {
        self.container_caching.store(caching, Ordering::Relaxed);
    }

    /// Store the password used for server-side hash generation (temp URLs).
    pub fn set_hash_password(&self, hash_password: impl Into<String>) {
        self.settings.write().hash_password = Some(hash_password.into());
    }

    pub fn hash_password(&self) -> Option<String> {
        self.settings.read().hash_password.clone()
    }

    // ===== Call accounting =====

    /// Count one outbound call made on this account's behalf. Components
    /// performing a remote call invoke this exactly once per call.
    pub fn increase_call_counter(&self) {
        self.calls.increment();
    }

    /// Calls made to the remote service so far, authentication included.
    pub fn number_of_calls(&self) -> u64 {
        self.calls.get()
    }
}

/// Replace the scheme and authority of `url` with `host_override`, keeping
/// the path.
fn rewrite_host(url: &str, host_override: &str) -> Result<String, SwiftError> {
    let parsed = Url::parse(url)
        .map_err(|e| TransportError::InvalidResponse(format!("bad endpoint URL: {e}")))?;
    Ok(format!(
        "{}{}",
        host_override.trim_end_matches('/'),
        parsed.path()
    ))
}
