//! Authentication and authorization for the groupgate server.
//!
//! This module provides:
//! - OIDC login against Microsoft Entra ID
//! - Group membership resolution and role computation at login
//! - Session storage (in memory or PostgreSQL)
//! - Session extractors and the route guard middleware
//!
//! # Authorization Model
//!
//! Roles are computed once per login from the user's membership in the
//! groups the role taxonomy watches, and stored in the session. Guarded
//! routes evaluate their `AuthzRequirement` against the stored role set on
//! every request. Membership changes take effect on the next login, or
//! earlier when a role refresh interval is configured.

pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod store;

use crate::config::SessionConfig;
use groupgate_access::RoleTaxonomy;
use groupgate_membership::MembershipResolver;
use std::sync::Arc;

pub use middleware::{AuthRejection, OptionalSession, RequireSession, RouteGuard, require};
pub use oidc::{AuthState, IdentityProvider, OidcClient, TokenResult};
pub use routes::{AuthError, callback, establish_session, home, login, logout, me};
pub use store::{MemorySessionStore, PgSessionStore, SessionStore, generate_session_id};

/// Shared application state.
pub struct AppState {
    /// Identity provider used for login.
    pub identity_provider: Arc<dyn IdentityProvider>,
    /// Resolves watched group membership at login.
    pub resolver: MembershipResolver,
    /// Role taxonomy, loaded once at startup.
    pub taxonomy: Arc<RoleTaxonomy>,
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        resolver: MembershipResolver,
        taxonomy: Arc<RoleTaxonomy>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            identity_provider,
            resolver,
            taxonomy,
            sessions,
            session_config,
        }
    }
}
