//! User profile stored with a session.
//!
//! The profile is built from the ID token claims returned by the identity
//! provider. Nothing here is persisted outside the session.

use serde::{Deserialize, Serialize};

use crate::auth::OidcClaims;

/// Profile of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// OIDC subject claim.
    subject: String,
    /// OIDC issuer URL.
    issuer: String,
    /// Display name (`name` claim).
    #[serde(default)]
    name: Option<String>,
    /// Sign-in name (`preferred_username` claim).
    #[serde(default)]
    preferred_username: Option<String>,
    /// Email address.
    #[serde(default)]
    email: Option<String>,
    /// Directory object id of the user (`oid` claim).
    #[serde(default)]
    object_id: Option<String>,
    /// Directory tenant id (`tid` claim).
    #[serde(default)]
    tenant_id: Option<String>,
}

impl UserProfile {
    /// Creates a profile with only the subject and issuer set.
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

    /// Returns the OIDC subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the OIDC issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the sign-in name, if known.
    #[must_use]
    pub fn preferred_username(&self) -> Option<&str> {
        self.preferred_username.as_deref()
    }

    /// Returns the email address, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the directory object id, if known.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Returns the directory tenant id, if known.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

impl From<OidcClaims> for UserProfile {
    fn from(claims: OidcClaims) -> Self {
        Self {
            subject: claims.subject,
            issuer: claims.issuer,
            name: claims.name,
            preferred_username: claims.preferred_username,
            email: claims.email,
            object_id: claims.object_id,
            tenant_id: claims.tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_from_claims() {
        let claims = OidcClaims::new(
            "sub_123".to_string(),
            "https://login.microsoftonline.com/tenant/v2.0".to_string(),
        )
        .with_name(Some("Alice".to_string()))
        .with_preferred_username(Some("alice@example.com".to_string()))
        .with_object_id(Some("oid-1".to_string()))
        .with_tenant_id(Some("tid-1".to_string()));

        let profile = UserProfile::from(claims);

        assert_eq!(profile.subject(), "sub_123");
        assert_eq!(profile.name(), Some("Alice"));
        assert_eq!(profile.preferred_username(), Some("alice@example.com"));
        assert_eq!(profile.email(), None);
        assert_eq!(profile.object_id(), Some("oid-1"));
        assert_eq!(profile.tenant_id(), Some("tid-1"));
    }

    #[test]
    fn profile_deserializes_with_missing_optionals() {
        let json = r#"{"subject": "sub", "issuer": "iss"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(profile, UserProfile::new("sub".to_string(), "iss".to_string()));
    }
}
