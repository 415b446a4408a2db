//! Domain error types for server operations.

use std::fmt;

/// Session persistence errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The storage backend failed.
    Backend { details: String },
    /// A stored session could not be decoded.
    InvalidRecord { session_id: String, details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { details } => write!(f, "session store error: {details}"),
            Self::InvalidRecord {
                session_id,
                details,
            } => {
                write!(f, "stored session '{session_id}' is invalid: {details}")
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

/// OIDC-related errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidcError {
    /// Configuration error (invalid URLs, etc.)
    Configuration(String),
    /// Failed to discover provider metadata.
    Discovery(String),
    /// Token exchange failed.
    TokenExchange(String),
    /// Token validation failed.
    TokenValidation(String),
}

impl fmt::Display for OidcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "OIDC configuration error: {msg}"),
            Self::Discovery(msg) => write!(f, "OIDC discovery error: {msg}"),
            Self::TokenExchange(msg) => write!(f, "OIDC token exchange error: {msg}"),
            Self::TokenValidation(msg) => write!(f, "OIDC token validation error: {msg}"),
        }
    }
}

impl std::error::Error for OidcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_store_error_display() {
        let err = SessionStoreError::InvalidRecord {
            session_id: "01J".to_string(),
            details: "missing field `roles`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stored session '01J' is invalid: missing field `roles`"
        );
    }

    #[test]
    fn oidc_error_display() {
        let err = OidcError::TokenValidation("nonce mismatch".to_string());
        assert_eq!(
            err.to_string(),
            "OIDC token validation error: nonce mismatch"
        );
    }
}
