//! swiftstore - session management for Swift-style object storage.
//!
//! This crate owns one account's credentials and drives the authentication
//! lifecycle against the service: token negotiation and transparent refresh,
//! clock-skew tracking, call accounting, and an optional cache of resolved
//! container handles.
//!
//! The [`Account`] is the entry point. It talks to the service exclusively
//! through the [`Transport`] trait; [`HttpTransport`] is the reqwest-backed
//! implementation speaking the Swift/Keystone protocol.
//!
//! ```no_run
//! use std::sync::Arc;
//! use swiftstore::{Account, AccountConfig, AuthenticationMethod, HttpTransport};
//!
//! # async fn demo() -> Result<(), swiftstore::SwiftError> {
//! let config = AccountConfig::new(
//!     "demo",
//!     "secret",
//!     "https://auth.example.com/v2.0",
//!     AuthenticationMethod::Keystone,
//! )
//! .with_tenant_name("demo-project");
//!
//! let transport = Arc::new(HttpTransport::new()?);
//! let account = Account::new(config, transport)?;
//!
//! account.authenticate().await?;
//! println!("stored bytes: {}", account.bytes_used().await?);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;

pub use account::{Account, CallCounter};
pub use api::{
    AccountMetadata, AuthRequest, AuthResponse, ContainerInfo, HttpTransport, SwiftError,
    Transport, TransportError,
};
pub use auth::{
    AccessToken, AccountConfig, AuthenticationMethod, Endpoint, EndpointCatalog, Tenant,
};
pub use cache::{Container, ContainerCache};
pub use clock::ClockReference;
