//! OIDC client implementation using the openidconnect crate.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use groupgate_access::{OidcClaims, OidcConfig};
use groupgate_membership::AccessToken;
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::OidcError;

/// The login capability of an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Generates the authorization URL for redirecting the user.
    fn authorization_url(&self) -> (String, AuthState);

    /// Exchanges the authorization code for tokens and extracts claims.
    async fn exchange_code(
        &self,
        code: &str,
        state: &AuthState,
    ) -> Result<TokenResult, Report<OidcError>>;
}

/// Data needed to complete the OIDC callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub nonce: String,
}

impl AuthState {
    /// Encodes the state for storage in a cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn to_cookie_value(&self) -> Result<String, serde_json::Error> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    /// Decodes state previously produced by [`AuthState::to_cookie_value`].
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Result of a successful token exchange.
pub struct TokenResult {
    pub claims: OidcClaims,
    pub access_token: AccessToken,
}

/// Directory claims that the standard claim set does not expose.
#[derive(Debug, Default, Deserialize)]
struct DirectoryClaims {
    oid: Option<String>,
    tid: Option<String>,
}

/// OIDC client for Microsoft Entra ID.
pub struct OidcClient {
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    http_client: reqwest::Client,
    config: OidcConfig,
}

impl OidcClient {
    /// Creates a new OIDC client by discovering the provider metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or discovery fails.
    #[instrument(skip_all, fields(issuer = %config.issuer_url()))]
    pub async fn discover(config: OidcConfig) -> Result<Self, Report<OidcError>> {
        let issuer_url = IssuerUrl::new(config.issuer_url())
            .map_err(|e| OidcError::Configuration(format!("invalid issuer URL: {e}")))?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OidcError::Configuration(format!("failed to create HTTP client: {e}")))?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| OidcError::Discovery(format!("failed to discover provider: {e}")))?;

        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string())
            .map_err(|e| OidcError::Configuration(format!("invalid redirect URI: {e}")))?;

        let client_id = ClientId::new(config.client_id().to_string());
        let client_secret = ClientSecret::new(config.client_secret().to_string());

        Ok(Self {
            provider_metadata,
            client_id,
            client_secret,
            redirect_url,
            http_client,
            config,
        })
    }

    /// Extracts the directory object and tenant ids from a token response.
    ///
    /// These are not part of the standard claim set, so the raw ID token
    /// payload is decoded directly. The token's signature has already been
    /// verified by the caller.
    fn extract_directory_claims<TR>(token_response: &TR) -> Result<DirectoryClaims, OidcError>
    where
        TR: Serialize,
    {
        let response_json = serde_json::to_value(token_response).map_err(|e| {
            OidcError::TokenValidation(format!("failed to serialize token response: {e}"))
        })?;

        let id_token = response_json
            .get("id_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| OidcError::TokenValidation("no id_token in response".to_string()))?;

        decode_jwt_payload(id_token)
    }
}

/// Decodes the payload of a compact JWT without verifying it.
fn decode_jwt_payload<T>(jwt: &str) -> Result<T, OidcError>
where
    T: for<'de> Deserialize<'de>,
{
    // JWT is base64url(header).base64url(payload).signature
    let parts: Vec<&str> = jwt.split('.').collect();
    if parts.len() != 3 {
        return Err(OidcError::TokenValidation("invalid JWT format".to_string()));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| OidcError::TokenValidation(format!("failed to decode JWT payload: {e}")))?;

    serde_json::from_slice(&payload_bytes)
        .map_err(|e| OidcError::TokenValidation(format!("failed to parse JWT payload: {e}")))
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn authorization_url(&self) -> (String, AuthState) {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        for scope in self.config.scopes() {
            auth_request = auth_request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        let state = AuthState {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            nonce: nonce.secret().clone(),
        };

        (auth_url.to_string(), state)
    }

    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        state: &AuthState,
    ) -> Result<TokenResult, Report<OidcError>> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let pkce_verifier = PkceCodeVerifier::new(state.pkce_verifier.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| OidcError::TokenExchange(format!("token endpoint error: {e}")))?;

        let token_response = token_request
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| OidcError::TokenExchange(format!("token exchange failed: {e}")))?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| OidcError::TokenExchange("no ID token in response".to_string()))?;

        let nonce = Nonce::new(state.nonce.clone());
        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| OidcError::TokenValidation(format!("ID token validation failed: {e}")))?;

        let name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());
        let preferred_username = claims
            .preferred_username()
            .map(|u| u.as_str().to_string());
        let email = claims.email().map(|e| e.as_str().to_string());

        let directory = Self::extract_directory_claims(&token_response)?;

        let oidc_claims = OidcClaims::new(claims.subject().to_string(), claims.issuer().to_string())
            .with_name(name)
            .with_preferred_username(preferred_username)
            .with_email(email)
            .with_object_id(directory.oid)
            .with_tenant_id(directory.tid);

        Ok(TokenResult {
            claims: oidc_claims,
            access_token: AccessToken::new(token_response.access_token().secret().clone()),
        })
    }
}
