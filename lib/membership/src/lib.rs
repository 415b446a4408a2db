//! Group membership resolution for groupgate.
//!
//! Given the signed-in user's delegated access token and the set of groups
//! the role taxonomy watches, the [`MembershipResolver`] determines which of
//! those groups the user belongs to. Checks go to the provider through the
//! [`MembershipCheck`] trait; [`GraphClient`] is the Microsoft Graph
//! implementation.
//!
//! Only the watched groups are ever asked about. The user's full group list
//! is never enumerated.

pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::{DEFAULT_GRAPH_BASE_URL, GraphClient, MembershipCheck};
pub use error::{MembershipCheckError, ResolutionError};
pub use resolver::MembershipResolver;
pub use types::{AccessToken, MAX_GROUPS_PER_CHECK, MembershipResult};
