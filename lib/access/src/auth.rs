//! Authentication primitives shared with the web layer.
//!
//! - `OidcClaims`: Identity claims extracted from the provider's ID token
//! - `AuthenticatedUser`: The session context handed to protected handlers

use crate::role::RoleSet;
use crate::session::{Session, SessionId};
use crate::user::UserProfile;

/// Represents an authenticated user context extracted from the request.
///
/// This is available in handlers after a route guard has admitted the
/// request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    session: Session,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user context.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Returns the current session ID.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the user's profile.
    #[must_use]
    pub fn user(&self) -> &UserProfile {
        self.session.user()
    }

    /// Returns the user's roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        self.session.roles()
    }
}

/// Claims extracted from an OIDC ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcClaims {
    /// The subject claim (unique user identifier from the provider).
    pub subject: String,
    /// The issuer URL.
    pub issuer: String,
    /// Display name.
    pub name: Option<String>,
    /// Sign-in name.
    pub preferred_username: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Directory object id (`oid`).
    pub object_id: Option<String>,
    /// Directory tenant id (`tid`).
    pub tenant_id: Option<String>,
}

impl OidcClaims {
    /// Creates a new set of OIDC claims.
    #[must_use]
    pub fn new(subject: String, issuer: String) -> Self {
        Self {
            subject,
            issuer,
            name: None,
            preferred_username: None,
            email: None,
            object_id: None,
            tenant_id: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the sign-in name.
    #[must_use]
    pub fn with_preferred_username(mut self, username: Option<String>) -> Self {
        self.preferred_username = username;
        self
    }

    /// Sets the email claim.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the directory object id.
    #[must_use]
    pub fn with_object_id(mut self, object_id: Option<String>) -> Self {
        self.object_id = object_id;
        self
    }

    /// Sets the directory tenant id.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }
}
