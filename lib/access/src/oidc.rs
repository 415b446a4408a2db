//! OIDC (OpenID Connect) configuration for Microsoft Entra ID.
//!
//! The issuer URL is derived from the authority host and tenant id, in the
//! v2.0 endpoint form used for OIDC discovery. Only a specific tenant is
//! supported: the multi-tenant aliases publish an issuer template rather
//! than an issuer, which fails discovery and ID token validation.

use serde::{Deserialize, Serialize};

/// Configuration for the OIDC identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// The directory tenant id. Must name a specific tenant; see
    /// [`OidcConfig::has_specific_tenant`].
    tenant_id: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// The redirect URI for the OAuth2 callback (e.g., "https://app.example.com/auth/callback").
    redirect_uri: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// The group membership check needs `GroupMember.Read.All`.
    #[serde(default = "default_scopes")]
    scopes: String,
    /// The authority host.
    /// Default: "https://login.microsoftonline.com"
    #[serde(default = "default_authority")]
    authority: String,
}

fn default_scopes() -> String {
    "openid,profile,email,offline_access,User.Read,GroupMember.Read.All".to_string()
}

/// Tenant aliases that resolve to more than one directory.
const MULTI_TENANT_ALIASES: [&str; 3] = ["common", "organizations", "consumers"];

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

impl OidcConfig {
    /// Creates a new OIDC configuration with defaults for optional fields.
    #[must_use]
    pub fn new(
        tenant_id: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            redirect_uri,
            scopes: default_scopes(),
            authority: default_authority(),
        }
    }

    /// Returns the OIDC issuer URL used for discovery.
    #[must_use]
    pub fn issuer_url(&self) -> String {
        format!(
            "{}/{}/v2.0",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Returns the directory tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns false for an empty tenant id or a multi-tenant alias.
    #[must_use]
    pub fn has_specific_tenant(&self) -> bool {
        let tenant = self.tenant_id.trim();
        !tenant.is_empty()
            && !MULTI_TENANT_ALIASES
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(tenant))
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth2 redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the OAuth2 scopes to request, parsed from comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|scope| !scope.is_empty())
            .collect()
    }

    /// Returns the authority host.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> OidcConfig {
        OidcConfig::new(
            "contoso-tenant".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/auth/callback".to_string(),
        )
    }

    #[test]
    fn new_config_has_defaults() {
        let config = sample_config();

        assert_eq!(
            config.issuer_url(),
            "https://login.microsoftonline.com/contoso-tenant/v2.0"
        );
        assert_eq!(config.client_id(), "client-id");
        assert_eq!(config.client_secret(), "client-secret");
        assert_eq!(
            config.redirect_uri(),
            "https://app.example.com/auth/callback"
        );
        assert!(config.scopes().contains(&"openid"));
        assert!(config.scopes().contains(&"GroupMember.Read.All"));
    }

    #[test]
    fn sovereign_cloud_authority_changes_issuer() {
        let json = r#"{
            "tenant_id": "tenant",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://app.example.com/callback",
            "authority": "https://login.microsoftonline.us/"
        }"#;

        let config: OidcConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(
            config.issuer_url(),
            "https://login.microsoftonline.us/tenant/v2.0"
        );
    }

    #[test]
    fn multi_tenant_aliases_are_not_specific() {
        assert!(sample_config().has_specific_tenant());

        for tenant in ["common", "Organizations", "consumers", " "] {
            let config = OidcConfig::new(
                tenant.to_string(),
                "client-id".to_string(),
                "client-secret".to_string(),
                "https://app.example.com/auth/callback".to_string(),
            );
            assert!(!config.has_specific_tenant(), "{tenant:?} accepted");
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "tenant_id": "tenant",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://app.example.com/callback"
        }"#;

        let config: OidcConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.tenant_id(), "tenant");
        assert_eq!(config.authority(), "https://login.microsoftonline.com");
        assert_eq!(
            config.scopes(),
            vec![
                "openid",
                "profile",
                "email",
                "offline_access",
                "User.Read",
                "GroupMember.Read.All"
            ]
        );
    }

    #[test]
    fn scopes_parses_comma_separated() {
        let json = r#"{
            "tenant_id": "tenant",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://app.example.com/callback",
            "scopes": "openid, profile, , GroupMember.Read.All"
        }"#;

        let config: OidcConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(
            config.scopes(),
            vec!["openid", "profile", "GroupMember.Read.All"]
        );
    }
}
