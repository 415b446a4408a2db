//! Role-based access control for groupgate.
//!
//! This crate provides:
//! - The role taxonomy (`RoleTaxonomy`), validated once at startup
//! - Role computation from group membership (`compute_roles`, `RoleSet`)
//! - Route requirements (`AuthzRequirement`)
//! - Session and user profile types
//!
//! # Access Control Model
//!
//! Each role is granted by membership in any of its configured identity
//! provider groups. Roles may imply other roles; the inheritance table must
//! be acyclic. Routes carry an `AuthzRequirement` that is evaluated against
//! the role set stored in the caller's session.
//!
//! # Example
//!
//! ```
//! use groupgate_access::{AuthzRequirement, RoleTaxonomy, TaxonomyConfig, compute_roles};
//! use groupgate_core::{GroupId, RoleName};
//! use std::collections::BTreeSet;
//!
//! let config = TaxonomyConfig::new()
//!     .role("admin", ["11111111-1111-4111-8111-111111111111"])
//!     .role("support", ["22222222-2222-4222-8222-222222222222"])
//!     .role("user", ["33333333-3333-4333-8333-333333333333"])
//!     .inherits("admin", ["support", "user"]);
//! let taxonomy = RoleTaxonomy::load(&config).expect("valid taxonomy");
//!
//! let admin_group: GroupId = "11111111-1111-4111-8111-111111111111".parse().unwrap();
//! let roles = compute_roles(&BTreeSet::from([admin_group]), &taxonomy);
//!
//! let support = RoleName::new("support").unwrap();
//! let user = RoleName::new("user").unwrap();
//! assert!(AuthzRequirement::all_of([support, user]).is_satisfied_by(&roles));
//! ```

pub mod auth;
pub mod error;
pub mod guard;
pub mod oidc;
pub mod role;
pub mod session;
pub mod taxonomy;
pub mod user;

// Re-export main types at crate root
pub use auth::{AuthenticatedUser, OidcClaims};
pub use error::{AuthorizationError, ConfigurationError};
pub use guard::AuthzRequirement;
pub use oidc::OidcConfig;
pub use role::{RoleSet, compute_roles};
pub use session::{Session, SessionId, SessionPolicy};
pub use taxonomy::{InheritanceTable, RoleTaxonomy, TaxonomyConfig};
pub use user::UserProfile;
