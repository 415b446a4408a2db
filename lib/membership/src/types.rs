//! Membership types and the Graph wire format.

use groupgate_core::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum number of group ids accepted by one `checkMemberGroups` call.
pub const MAX_GROUPS_PER_CHECK: usize = 20;

/// Delegated access token of the authenticated user.
///
/// The token is opaque to this crate and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a bearer token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Returns the token for use in an `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// The watched groups a user was found to belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipResult {
    group_ids: BTreeSet<GroupId>,
}

impl MembershipResult {
    /// Creates an empty result.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the member group ids.
    #[must_use]
    pub fn group_ids(&self) -> &BTreeSet<GroupId> {
        &self.group_ids
    }

    /// Consumes the result, returning the member group ids.
    #[must_use]
    pub fn into_group_ids(self) -> BTreeSet<GroupId> {
        self.group_ids
    }
}

impl FromIterator<GroupId> for MembershipResult {
    fn from_iter<T: IntoIterator<Item = GroupId>>(iter: T) -> Self {
        Self {
            group_ids: iter.into_iter().collect(),
        }
    }
}

/// Body of a `checkMemberGroups` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMemberGroupsRequest {
    /// Candidate group ids, lowercase and sorted.
    pub group_ids: Vec<String>,
}

impl CheckMemberGroupsRequest {
    /// Builds a request body for the given groups.
    #[must_use]
    pub fn new(group_ids: &[GroupId]) -> Self {
        let unique: BTreeSet<&GroupId> = group_ids.iter().collect();
        Self {
            group_ids: unique.into_iter().map(ToString::to_string).collect(),
        }
    }
}

/// Body of a `checkMemberGroups` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckMemberGroupsResponse {
    /// Ids of the candidate groups the user is a member of.
    #[serde(default)]
    pub value: Vec<String>,
}
