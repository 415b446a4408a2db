//! Authentication routes for login, callback, and logout.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use groupgate_access::{RoleSet, Session, SessionId, UserProfile, compute_roles};
use groupgate_core::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{error, info, instrument, warn};

use super::{
    AppState,
    middleware::{OptionalSession, RequireSession, SESSION_COOKIE},
    oidc::{AuthState, TokenResult},
    store::generate_session_id,
};

/// Auth state cookie name (for CSRF protection during OIDC flow).
const AUTH_STATE_COOKIE: &str = "auth_state";

/// Query parameters for the OIDC callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Body of the `/` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub roles: RoleSet,
}

/// Shows whether the caller is signed in.
pub async fn home(OptionalSession(user): OptionalSession) -> Json<HomeResponse> {
    Json(match user {
        Some(user) => HomeResponse {
            logged_in: true,
            user: Some(user.user().clone()),
            roles: user.roles().clone(),
        },
        None => HomeResponse {
            logged_in: false,
            user: None,
            roles: RoleSet::none(),
        },
    })
}

/// Initiates the OIDC login flow by redirecting to the identity provider.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let (auth_url, auth_state) = state.identity_provider.authorization_url();

    // Store the auth state in a secure cookie for validation on callback
    let auth_state_value = auth_state
        .to_cookie_value()
        .map_err(|e| AuthError::Internal(format!("failed to encode auth state: {e}")))?;

    let cookie = Cookie::build((AUTH_STATE_COOKIE, auth_state_value))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10));

    Ok((jar.add(cookie), Redirect::to(&auth_url)))
}

/// Handles the OIDC callback after the user authenticates with the identity provider.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(error) = query.error {
        return Err(AuthError::ProviderRejected {
            error,
            description: query.error_description.unwrap_or_default(),
        });
    }

    let auth_state_cookie = jar
        .get(AUTH_STATE_COOKIE)
        .ok_or(AuthError::MissingAuthState)?;
    let auth_state = AuthState::from_cookie_value(auth_state_cookie.value())
        .ok_or(AuthError::InvalidAuthState)?;

    if query.state.as_deref() != Some(auth_state.csrf_token.as_str()) {
        return Err(AuthError::CsrfMismatch);
    }
    let code = query.code.ok_or(AuthError::MissingCode)?;

    let token_result = state
        .identity_provider
        .exchange_code(&code, &auth_state)
        .await
        .map_err(|report| AuthError::TokenExchange(report.to_string()))?;

    let session = establish_session(&state, token_result).await?;

    let session_cookie = Cookie::build((SESSION_COOKIE, session.id().as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(state.session_config.duration_minutes));

    let remove_auth_state = Cookie::build((AUTH_STATE_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    let jar = jar.add(session_cookie).add(remove_auth_state);

    Ok((jar, Redirect::to("/")))
}

/// Resolves the user's roles and stores a new session for them.
///
/// Nothing is stored unless membership resolution succeeds. A user who
/// belongs to none of the watched groups still gets a session, with an
/// empty role set.
///
/// # Errors
///
/// Returns `AuthError::Resolution` if membership could not be resolved and
/// `AuthError::SessionStore` if the session could not be saved.
#[instrument(skip_all, fields(subject = %token.claims.subject))]
pub async fn establish_session(state: &AppState, token: TokenResult) -> Result<Session, AuthError> {
    let TokenResult {
        claims,
        access_token,
    } = token;

    let membership = state
        .resolver
        .resolve(&access_token, state.taxonomy.watched_groups())
        .await
        .map_err(|report| AuthError::Resolution(report.to_string()))?;

    let roles = compute_roles(membership.group_ids(), &state.taxonomy);

    let mut session = Session::new(
        generate_session_id(),
        UserProfile::from(claims),
        roles,
        state.session_config.duration(),
    );
    if state.session_config.expose_group_ids {
        session = session.with_group_ids(membership.into_group_ids());
    }

    state
        .sessions
        .save(&session)
        .await
        .map_err(|report| AuthError::SessionStore(report.to_string()))?;

    info!(
        session_id = %session.id(),
        roles = ?session.roles(),
        "session established"
    );
    Ok(session)
}

/// Body of the `/me` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub roles: RoleSet,
    pub role_count: usize,
    pub groups_fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<BTreeSet<GroupId>>,
}

/// Returns the caller's profile and roles.
pub async fn me(
    State(state): State<Arc<AppState>>,
    RequireSession(user): RequireSession,
) -> Json<MeResponse> {
    let session = user.session();
    let group_ids = if state.session_config.expose_group_ids {
        session.group_ids().cloned()
    } else {
        None
    };

    Json(MeResponse {
        user: session.user().clone(),
        roles: session.roles().clone(),
        role_count: session.roles().len(),
        groups_fetched_at: session.groups_fetched_at(),
        group_ids,
    })
}

/// Logs out the user by deleting their session.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let session_id = SessionId::new(session_cookie.value().to_string());

        if let Err(report) = state.sessions.delete(&session_id).await {
            warn!(error = %report, "failed to delete session on logout");
        }
    }

    let remove_session = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    (jar.add(remove_session), Redirect::to("/"))
}

/// Authentication errors.
#[derive(Debug)]
pub enum AuthError {
    MissingAuthState,
    InvalidAuthState,
    CsrfMismatch,
    MissingCode,
    ProviderRejected { error: String, description: String },
    TokenExchange(String),
    Resolution(String),
    SessionStore(String),
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingAuthState => (StatusCode::BAD_REQUEST, "Missing auth state"),
            Self::InvalidAuthState => (StatusCode::BAD_REQUEST, "Invalid auth state"),
            Self::CsrfMismatch => (StatusCode::BAD_REQUEST, "CSRF token mismatch"),
            Self::MissingCode => (StatusCode::BAD_REQUEST, "Missing authorization code"),
            Self::ProviderRejected { error, description } => {
                warn!(%error, %description, "identity provider rejected sign-in");
                (StatusCode::UNAUTHORIZED, "Sign-in was not completed")
            }
            Self::TokenExchange(msg) => {
                error!("Token exchange failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
            Self::Resolution(msg) => {
                error!("Group membership resolution failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "Authentication failed")
            }
            Self::SessionStore(msg) => {
                error!("Session store error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
