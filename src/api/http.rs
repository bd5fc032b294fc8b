//! reqwest-backed [`Transport`] speaking the Swift/Keystone wire protocol.
//!
//! KEYSTONE authenticates with a JSON `POST {auth_url}/tokens`; BASIC and
//! TEMPAUTH share the legacy header-based `GET {auth_url}` exchange. Account
//! and container metadata come back as response headers on HEAD requests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{header::HeaderMap, Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{AuthenticationMethod, Endpoint, Tenant, OBJECT_STORE_SERVICE};

use super::{AccountMetadata, AuthRequest, AuthResponse, ContainerInfo, Transport, TransportError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token lifetime assumed when TEMPAUTH/BASIC responses omit
/// `X-Auth-Token-Expires`. Swift tokens last 24 hours by default.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

const HEADER_AUTH_TOKEN: &str = "X-Auth-Token";
const HEADER_STORAGE_USER: &str = "X-Storage-User";
const HEADER_STORAGE_PASS: &str = "X-Storage-Pass";
const HEADER_STORAGE_URL: &str = "X-Storage-Url";
const HEADER_TOKEN_EXPIRES: &str = "X-Auth-Token-Expires";
const HEADER_ACCOUNT_BYTES: &str = "X-Account-Bytes-Used";
const HEADER_ACCOUNT_OBJECTS: &str = "X-Account-Object-Count";
const HEADER_CONTAINER_BYTES: &str = "X-Container-Bytes-Used";
const HEADER_CONTAINER_OBJECTS: &str = "X-Container-Object-Count";

// ============================================================================
// Wire types (Keystone v2)
// ============================================================================

#[derive(Debug, Serialize)]
struct KeystoneAuthBody<'a> {
    auth: KeystoneAuth<'a>,
}

#[derive(Debug, Serialize)]
struct KeystoneAuth<'a> {
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
    #[serde(rename = "tenantName", skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct KeystoneAccessWrapper {
    access: KeystoneAccess,
}

#[derive(Debug, Deserialize)]
struct KeystoneAccess {
    token: KeystoneToken,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<KeystoneService>,
}

#[derive(Debug, Deserialize)]
struct KeystoneToken {
    id: String,
    expires: DateTime<Utc>,
    tenant: Option<KeystoneTenant>,
}

#[derive(Debug, Deserialize)]
struct KeystoneTenant {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct KeystoneService {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<KeystoneEndpoint>,
}

#[derive(Debug, Deserialize)]
struct KeystoneEndpoint {
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
    #[serde(rename = "internalURL")]
    internal_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TenantsResponse {
    #[serde(default)]
    tenants: Vec<KeystoneTenant>,
}

// ============================================================================
// Transport implementation
// ============================================================================

/// HTTP transport for Swift and Keystone endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, TransportError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::from_status(status, &body))
        }
    }

    async fn authenticate_keystone(
        &self,
        request: &AuthRequest,
    ) -> Result<AuthResponse, TransportError> {
        let url = format!("{}/tokens", request.auth_url.trim_end_matches('/'));
        let body = KeystoneAuthBody {
            auth: KeystoneAuth {
                password_credentials: PasswordCredentials {
                    username: &request.username,
                    password: &request.password,
                },
                tenant_id: request.tenant_id.as_deref(),
                tenant_name: request.tenant_name.as_deref(),
            },
        };

        debug!(url = %url, scoped = request.tenant_id.is_some() || request.tenant_name.is_some(),
               "Sending Keystone token request");

        let response = self.client.post(&url).json(&body).send().await?;
        let response = Self::check_response(response).await?;

        let wrapper: KeystoneAccessWrapper = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("keystone token body: {e}")))?;

        Ok(keystone_auth_response(wrapper))
    }

    /// BASIC and TEMPAUTH share one flow: a GET against the auth URL that
    /// returns the token and storage URL in response headers. They differ
    /// only in how the credentials are attached.
    async fn authenticate_legacy(
        &self,
        request: &AuthRequest,
    ) -> Result<AuthResponse, TransportError> {
        debug!(url = %request.auth_url, method = ?request.method, "Sending legacy auth request");

        let builder = self.client.get(&request.auth_url);
        let builder = match request.method {
            AuthenticationMethod::Basic => {
                builder.basic_auth(&request.username, Some(&request.password))
            }
            _ => builder
                .header(HEADER_STORAGE_USER, &request.username)
                .header(HEADER_STORAGE_PASS, &request.password),
        };

        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let headers = response.headers();

        let token = required_header(headers, HEADER_AUTH_TOKEN)?;
        let storage_url = required_header(headers, HEADER_STORAGE_URL)?;
        let lifetime_secs = match headers.get(HEADER_TOKEN_EXPIRES) {
            Some(v) => v
                .to_str()
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    TransportError::InvalidResponse(format!("malformed {HEADER_TOKEN_EXPIRES} header"))
                })?,
            None => DEFAULT_TOKEN_LIFETIME_SECS,
        };

        Ok(AuthResponse {
            token,
            expires_at: Utc::now() + Duration::seconds(lifetime_secs),
            endpoints: vec![Endpoint {
                service_type: OBJECT_STORE_SERVICE.to_string(),
                region: None,
                public_url: storage_url,
                internal_url: None,
            }],
            tenant: None,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        match request.method {
            AuthenticationMethod::Keystone => self.authenticate_keystone(request).await,
            AuthenticationMethod::Basic | AuthenticationMethod::TempAuth => {
                self.authenticate_legacy(request).await
            }
        }
    }

    async fn list_tenants(
        &self,
        auth_url: &str,
        token: &str,
    ) -> Result<Vec<Tenant>, TransportError> {
        let url = format!("{}/tenants", auth_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header(HEADER_AUTH_TOKEN, token)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let parsed: TenantsResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("tenants body: {e}")))?;

        debug!(count = parsed.tenants.len(), "Tenant list received");
        Ok(parsed
            .tenants
            .into_iter()
            .map(|t| Tenant {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn server_time(&self, url: &str) -> Result<DateTime<Utc>, TransportError> {
        let response = self.client.head(url).send().await?;
        // The Date header is present on error responses too; any reply from
        // the service is a usable clock sample.
        let date = response
            .headers()
            .get(reqwest::header::DATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| TransportError::InvalidResponse("missing Date header".to_string()))?;
        parse_date_header(date)
    }

    async fn account_metadata(
        &self,
        storage_url: &str,
        token: &str,
    ) -> Result<AccountMetadata, TransportError> {
        let response = self
            .client
            .head(storage_url)
            .header(HEADER_AUTH_TOKEN, token)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let headers = response.headers();

        Ok(AccountMetadata {
            bytes_used: counter_header(headers, HEADER_ACCOUNT_BYTES)?,
            object_count: counter_header(headers, HEADER_ACCOUNT_OBJECTS)?,
        })
    }

    async fn container_info(
        &self,
        storage_url: &str,
        token: &str,
        name: &str,
    ) -> Result<ContainerInfo, TransportError> {
        let mut url = Url::parse(storage_url)
            .map_err(|e| TransportError::InvalidResponse(format!("bad storage URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidResponse("storage URL cannot be a base".to_string()))?
            .push(name);

        let response = self
            .client
            .head(url)
            .header(HEADER_AUTH_TOKEN, token)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let headers = response.headers();

        Ok(ContainerInfo {
            bytes_used: counter_header(headers, HEADER_CONTAINER_BYTES)?,
            object_count: counter_header(headers, HEADER_CONTAINER_OBJECTS)?,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn keystone_auth_response(wrapper: KeystoneAccessWrapper) -> AuthResponse {
    let access = wrapper.access;
    let endpoints = access
        .service_catalog
        .into_iter()
        .flat_map(|service| {
            let service_type = service.service_type;
            service.endpoints.into_iter().map(move |e| Endpoint {
                service_type: service_type.clone(),
                region: e.region,
                public_url: e.public_url,
                internal_url: e.internal_url,
            })
        })
        .collect();

    AuthResponse {
        token: access.token.id,
        expires_at: access.token.expires,
        endpoints,
        tenant: access.token.tenant.map(|t| Tenant {
            id: t.id,
            name: t.name,
        }),
    }
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, TransportError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| TransportError::InvalidResponse(format!("missing {name} header")))
}

/// Usage counters default to zero when absent; Swift omits them on empty
/// accounts behind some proxies.
fn counter_header(headers: &HeaderMap, name: &str) -> Result<u64, TransportError> {
    match headers.get(name) {
        None => Ok(0),
        Some(v) => v
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| TransportError::InvalidResponse(format!("malformed {name} header"))),
    }
}

fn parse_date_header(value: &str) -> Result<DateTime<Utc>, TransportError> {
    DateTime::parse_from_rfc2822(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TransportError::InvalidResponse(format!("unparsable Date header: {e}")))
}
