use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::AuthResponse;

/// Service type of object-store entries in a Keystone catalog.
pub const OBJECT_STORE_SERVICE: &str = "object-store";

/// An account-scoping identity on the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

/// One service endpoint from the catalog returned at authentication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub service_type: String,
    pub region: Option<String>,
    pub public_url: String,
    pub internal_url: Option<String>,
}

/// The endpoints an access token authorizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCatalog(Vec<Endpoint>);

impl EndpointCatalog {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self(endpoints)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.0
    }

    /// Pick the object-store endpoint, honoring a preferred region. With no
    /// preference, or no endpoint in the preferred region, the first
    /// applicable endpoint is selected.
    pub fn storage_endpoint(&self, preferred_region: Option<&str>) -> Option<&Endpoint> {
        let stores = || self.0.iter().filter(|e| e.service_type == OBJECT_STORE_SERVICE);
        if let Some(region) = preferred_region {
            if let Some(found) = stores().find(|e| e.region.as_deref() == Some(region)) {
                return Some(found);
            }
        }
        stores().next()
    }
}

/// A short-lived credential proving successful authentication.
///
/// Owned by the account that obtained it and replaced wholesale on
/// re-authentication, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
    catalog: EndpointCatalog,
    tenant: Option<Tenant>,
}

impl AccessToken {
    pub(crate) fn from_response(response: AuthResponse) -> Self {
        Self {
            token: response.token,
            expires_at: response.expires_at,
            catalog: EndpointCatalog::new(response.endpoints),
            tenant: response.tenant,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    /// The tenant this token was issued for, if it is scoped.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    /// A token is valid strictly before its expiry instant. `now` must be
    /// the clock-adjusted time, not the raw local clock.
    pub fn valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_with(endpoints: Vec<Endpoint>) -> AccessToken {
        AccessToken {
            token: "tok".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            catalog: EndpointCatalog::new(endpoints),
            tenant: None,
        }
    }

    fn store_endpoint(region: &str, url: &str) -> Endpoint {
        Endpoint {
            service_type: OBJECT_STORE_SERVICE.to_string(),
            region: Some(region.to_string()),
            public_url: url.to_string(),
            internal_url: None,
        }
    }

    #[test]
    fn test_validity_is_strict() {
        let token = token_with(vec![]);
        assert!(token.valid_at(Utc::now()));
        assert!(!token.valid_at(token.expires_at()));
        assert!(!token.valid_at(token.expires_at() + Duration::seconds(1)));
    }

    #[test]
    fn test_storage_endpoint_prefers_region() {
        let token = token_with(vec![
            store_endpoint("east", "https://east.example.com/v1"),
            store_endpoint("west", "https://west.example.com/v1"),
        ]);
        let picked = token.catalog().storage_endpoint(Some("west")).expect("endpoint");
        assert_eq!(picked.public_url, "https://west.example.com/v1");
    }

    #[test]
    fn test_storage_endpoint_falls_back_to_first() {
        let token = token_with(vec![
            store_endpoint("east", "https://east.example.com/v1"),
            store_endpoint("west", "https://west.example.com/v1"),
        ]);
        // Unknown region falls back to the first object-store entry.
        let picked = token.catalog().storage_endpoint(Some("north")).expect("endpoint");
        assert_eq!(picked.public_url, "https://east.example.com/v1");
        let picked = token.catalog().storage_endpoint(None).expect("endpoint");
        assert_eq!(picked.public_url, "https://east.example.com/v1");
    }

    #[test]
    fn test_storage_endpoint_skips_other_services() {
        let token = token_with(vec![
            Endpoint {
                service_type: "identity".to_string(),
                region: None,
                public_url: "https://auth.example.com/v2.0".to_string(),
                internal_url: None,
            },
            store_endpoint("east", "https://east.example.com/v1"),
        ]);
        let picked = token.catalog().storage_endpoint(None).expect("endpoint");
        assert_eq!(picked.public_url, "https://east.example.com/v1");
    }
}
