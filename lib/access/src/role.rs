//! Role sets and role computation.
//!
//! A user's roles are derived from the identity-provider groups they belong
//! to: membership in any group configured for a role grants that role, and
//! granted roles are then closed over the inheritance table.

use crate::taxonomy::{InheritanceTable, RoleTaxonomy};
use groupgate_core::{GroupId, RoleName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of roles held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<RoleName>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a role set from the given roles, without applying inheritance.
    #[must_use]
    pub fn from_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = RoleName>,
    {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    /// Returns the set extended with every role implied, directly or
    /// transitively, by a role already in the set.
    ///
    /// Terminates for any acyclic inheritance table, which `RoleTaxonomy`
    /// guarantees.
    #[must_use]
    pub fn close_over(self, inheritance: &InheritanceTable) -> Self {
        let mut roles = self.roles;
        let mut pending: Vec<RoleName> = roles.iter().cloned().collect();

        while let Some(role) = pending.pop() {
            for implied in inheritance.get(&role).into_iter().flatten() {
                if roles.insert(implied.clone()) {
                    pending.push(implied.clone());
                }
            }
        }

        Self { roles }
    }

    /// Returns true if the set contains the role.
    #[must_use]
    pub fn contains(&self, role: &RoleName) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if the set holds no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns an iterator over the roles in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        self.roles.iter()
    }

    /// Returns the roles as a set.
    #[must_use]
    pub fn as_set(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }
}

impl FromIterator<RoleName> for RoleSet {
    fn from_iter<T: IntoIterator<Item = RoleName>>(iter: T) -> Self {
        Self::from_roles(iter)
    }
}

/// Computes the final role set for a user from their group memberships.
///
/// A role is granted directly when the membership intersects its configured
/// groups. The direct roles are then closed over the inheritance table.
#[must_use]
pub fn compute_roles(membership: &BTreeSet<GroupId>, taxonomy: &RoleTaxonomy) -> RoleSet {
    taxonomy
        .role_groups()
        .iter()
        .filter(|(_, groups)| !groups.is_disjoint(membership))
        .map(|(role, _)| role.clone())
        .collect::<RoleSet>()
        .close_over(taxonomy.inheritance())
}
