//! Authentication building blocks.
//!
//! This module provides:
//! - `AccountConfig`: the immutable credential bundle an account is built from
//! - `AccessToken`: the expiring credential plus its endpoint catalog
//! - the method-specific authentication flows (BASIC, TEMPAUTH, KEYSTONE)

pub mod access;
pub(crate) mod authenticator;
pub mod credentials;

pub use access::{AccessToken, Endpoint, EndpointCatalog, Tenant, OBJECT_STORE_SERVICE};
pub use credentials::{AccountConfig, AuthenticationMethod};
