//! Route authorization requirements.
//!
//! An `AuthzRequirement` is attached to a route when the route is
//! registered and evaluated against the caller's role set on every request.
//! Evaluation is a pure function of the requirement and the role set passed
//! in; it never reads or mutates session state itself.

use crate::error::AuthorizationError;
use crate::role::RoleSet;
use groupgate_core::RoleName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A role requirement gating access to a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum AuthzRequirement {
    /// Every listed role must be held.
    AllOf(BTreeSet<RoleName>),
    /// At least one listed role must be held.
    AnyOf(BTreeSet<RoleName>),
}

impl AuthzRequirement {
    /// Requires every one of the given roles.
    #[must_use]
    pub fn all_of<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = RoleName>,
    {
        Self::AllOf(roles.into_iter().collect())
    }

    /// Requires at least one of the given roles.
    #[must_use]
    pub fn any_of<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = RoleName>,
    {
        Self::AnyOf(roles.into_iter().collect())
    }

    /// Requires a single role.
    #[must_use]
    pub fn require_role(role: RoleName) -> Self {
        Self::AllOf(BTreeSet::from([role]))
    }

    /// Returns the roles named by the requirement.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<RoleName> {
        match self {
            Self::AllOf(roles) | Self::AnyOf(roles) => roles,
        }
    }

    /// Returns true if the role set satisfies the requirement.
    ///
    /// An empty `AllOf` is satisfied by any role set; an empty `AnyOf`
    /// is satisfied by none.
    #[must_use]
    pub fn is_satisfied_by(&self, roles: &RoleSet) -> bool {
        match self {
            Self::AllOf(required) => required.is_subset(roles.as_set()),
            Self::AnyOf(required) => !required.is_disjoint(roles.as_set()),
        }
    }

    /// Evaluates the requirement for a caller.
    ///
    /// `None` means the caller has no session; evaluation fails closed.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when there is no role set, and `Denied`
    /// when the role set does not satisfy the requirement.
    pub fn authorize(&self, roles: Option<&RoleSet>) -> Result<(), AuthorizationError> {
        let roles = roles.ok_or(AuthorizationError::NotAuthenticated)?;
        if self.is_satisfied_by(roles) {
            Ok(())
        } else {
            Err(AuthorizationError::Denied {
                requirement: self.to_string(),
            })
        }
    }
}

impl fmt::Display for AuthzRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, roles) = match self {
            Self::AllOf(roles) => ("all of", roles),
            Self::AnyOf(roles) => ("any of", roles),
        };
        let names: Vec<&str> = roles.iter().map(RoleName::as_str).collect();
        write!(f, "{label} [{}]", names.join(", "))
    }
}
