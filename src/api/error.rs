use thiserror::Error;

/// Errors raised by a [`Transport`](super::Transport) implementation.
///
/// The transport owns retry/backoff policy for transient failures; by the
/// time an error reaches the session layer it is final for that call.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("unauthorized - token rejected or expired")]
    Unauthorized,

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => TransportError::Unauthorized,
            _ => TransportError::Http {
                status: status.as_u16(),
                body: Self::truncate_body(body),
            },
        }
    }

    /// True when the remote rejected the token. The session layer uses this
    /// to decide whether an implicit re-authentication may be attempted.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized)
    }
}

/// Errors surfaced by [`Account`](crate::Account) operations.
#[derive(Error, Debug)]
pub enum SwiftError {
    /// Bad credentials or a transport failure during the authentication
    /// exchange. Never retried automatically.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[source] TransportError),

    /// Zero or multiple tenants were reachable and none was supplied; the
    /// account is limited to tenant listing.
    #[error("tenant not resolved; only tenant listing is available")]
    TenantUnresolved,

    /// The access token expired and reauthentication is disabled, so the
    /// caller must call `authenticate()` explicitly.
    #[error("session expired and reauthentication is disallowed")]
    SessionExpired,

    /// A non-auth network or service failure during a data operation.
    #[error("remote call failed: {0}")]
    RemoteCallFailed(#[from] TransportError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_unauthorized() {
        let err = TransportError::from_status(reqwest::StatusCode::UNAUTHORIZED, "denied");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_from_status_keeps_status_and_body() {
        let err = TransportError::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "busy");
        match err {
            TransportError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let err = TransportError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            TransportError::Http { body, .. } => {
                assert!(body.len() < 600);
                assert!(body.contains("truncated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
