//! Transport layer for the object-storage service.
//!
//! This module defines the [`Transport`] trait the session layer calls into,
//! the request/response value types it exchanges, and the reqwest-backed
//! [`HttpTransport`] speaking the Swift/Keystone protocol.

pub mod error;
pub mod http;
pub mod transport;

pub use error::{SwiftError, TransportError};
pub use http::HttpTransport;
pub use transport::{AccountMetadata, AuthRequest, AuthResponse, ContainerInfo, Transport};
