//! Authentication middleware and extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use groupgate_access::{AuthenticatedUser, AuthorizationError, AuthzRequirement, Session, SessionId};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::AppState;

/// Session cookie name.
pub(crate) const SESSION_COOKIE: &str = "session";

/// Where unauthenticated callers are sent.
pub(crate) const LOGIN_PATH: &str = "/login";

/// Loads the caller's session if it exists and is still usable.
///
/// Expired and stale sessions are deleted and treated as absent.
pub(crate) async fn load_session(
    app: &AppState,
    jar: &CookieJar,
) -> Result<Option<Session>, AuthRejection> {
    let Some(session_cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let session_id = SessionId::new(session_cookie.value().to_string());

    let session = app.sessions.find(&session_id).await.map_err(|report| {
        error!(error = %report, "failed to load session");
        AuthRejection::InternalError
    })?;
    let Some(session) = session else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.is_expired(now) || session.is_stale(&app.session_config.policy(), now) {
        debug!(%session_id, "discarding expired or stale session");
        if let Err(report) = app.sessions.delete(&session_id).await {
            warn!(error = %report, "failed to delete session");
        }
        return Ok(None);
    }

    Ok(Some(session))
}

/// Extractor for requiring an authenticated user.
///
/// If the user is not authenticated, they will be redirected to the login page.
pub struct RequireSession(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireSession
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A route guard has already loaded the session.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(RequireSession(user.clone()));
        }

        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        load_session(&app_state, &jar)
            .await?
            .map(|session| RequireSession(AuthenticatedUser::new(session)))
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// Returns None if the user is not authenticated.
pub struct OptionalSession(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalSession
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireSession::from_request_parts(parts, state).await {
            Ok(RequireSession(user)) => Ok(OptionalSession(Some(user))),
            Err(_) => Ok(OptionalSession(None)),
        }
    }
}

/// State of the [`require`] middleware: the requirement a route is
/// registered with.
#[derive(Clone)]
pub struct RouteGuard {
    app: Arc<AppState>,
    requirement: Arc<AuthzRequirement>,
}

impl RouteGuard {
    /// Creates a guard enforcing `requirement`.
    pub fn new(app: Arc<AppState>, requirement: AuthzRequirement) -> Self {
        Self {
            app,
            requirement: Arc::new(requirement),
        }
    }
}

/// Middleware admitting a request only if the caller's roles satisfy the
/// route's requirement.
///
/// Admitted requests carry the [`AuthenticatedUser`] as a request extension
/// and count as session activity. A session deleted while the request was
/// being checked (a concurrent logout) is not admitted.
///
/// ```ignore
/// let guard = RouteGuard::new(state.clone(), AuthzRequirement::require_role(admin));
/// get(handler).route_layer(middleware::from_fn_with_state(guard, require))
/// ```
pub async fn require(
    State(guard): State<RouteGuard>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let session = load_session(&guard.app, &jar).await?;

    guard
        .requirement
        .authorize(session.as_ref().map(Session::roles))
        .inspect_err(|e| debug!(path = %request.uri().path(), reason = %e, "request rejected"))?;

    let Some(mut session) = session else {
        return Err(AuthRejection::NotAuthenticated);
    };

    let now = Utc::now();
    match guard.app.sessions.touch(session.id(), now).await {
        Ok(true) => session.touch(now),
        Ok(false) => {
            debug!(session_id = %session.id(), "session ended while request was checked");
            return Err(AuthRejection::NotAuthenticated);
        }
        Err(report) => warn!(error = %report, "failed to record session activity"),
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser::new(session));
    Ok(next.run(request).await)
}

/// Rejection type for authentication extractors and guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No usable session; the caller must log in.
    NotAuthenticated,
    /// The caller's roles do not satisfy the route's requirement.
    Forbidden { requirement: String },
    /// The session store could not be consulted.
    InternalError,
}

impl From<AuthorizationError> for AuthRejection {
    fn from(error: AuthorizationError) -> Self {
        match error {
            AuthorizationError::NotAuthenticated => Self::NotAuthenticated,
            AuthorizationError::Denied { requirement } => Self::Forbidden { requirement },
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => Redirect::to(LOGIN_PATH).into_response(),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            Self::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
