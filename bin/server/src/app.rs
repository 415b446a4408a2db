//! HTTP routes of the groupgate server.

use axum::{
    Extension, Router,
    middleware::from_fn_with_state,
    routing::{MethodRouter, get},
};
use groupgate_access::{AuthenticatedUser, AuthzRequirement};
use groupgate_core::RoleName;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, RouteGuard};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let admin = RoleName::from_static("admin");
    let support = RoleName::from_static("support");

    Router::new()
        .route("/", get(auth::home))
        .route("/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/me", get(auth::me))
        .route("/logout", get(auth::logout))
        .route(
            "/admin",
            guarded(
                &state,
                AuthzRequirement::require_role(admin.clone()),
                get(admin_area),
            ),
        )
        .route(
            "/support",
            guarded(
                &state,
                AuthzRequirement::require_role(support.clone()),
                get(support_area),
            ),
        )
        .route(
            "/support-or-admin",
            guarded(
                &state,
                AuthzRequirement::any_of([support, admin]),
                get(support_or_admin_area),
            ),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Puts `route` behind a guard enforcing `requirement`.
fn guarded(
    state: &Arc<AppState>,
    requirement: AuthzRequirement,
    route: MethodRouter<Arc<AppState>>,
) -> MethodRouter<Arc<AppState>> {
    let guard = RouteGuard::new(Arc::clone(state), requirement);
    route.route_layer(from_fn_with_state(guard, auth::require))
}

async fn admin_area(Extension(user): Extension<AuthenticatedUser>) -> String {
    format!("Admin area. Signed in as {}.", user.user().subject())
}

async fn support_area(Extension(user): Extension<AuthenticatedUser>) -> String {
    format!("Support area. Signed in as {}.", user.user().subject())
}

async fn support_or_admin_area(Extension(user): Extension<AuthenticatedUser>) -> String {
    let roles: Vec<&str> = user.roles().iter().map(|role| role.as_str()).collect();
    format!("Staff area. Roles: {}.", roles.join(", "))
}
