//! Role taxonomy configuration.
//!
//! The taxonomy maps each role to the identity-provider groups that grant
//! it, and each role to the roles it implies. It is validated once at
//! startup and is immutable afterwards, so it can be shared across
//! requests behind an `Arc` without synchronization.

use crate::error::ConfigurationError;
use groupgate_core::{GroupId, RoleName};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Mapping from a role to the roles it implies.
pub type InheritanceTable = BTreeMap<RoleName, BTreeSet<RoleName>>;

/// Raw taxonomy configuration as loaded from configuration sources.
///
/// Group lists may be given either as arrays or as comma-separated strings,
/// which keeps them expressible through environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Role name to the group GUIDs granting it.
    #[serde(default, deserialize_with = "string_list_map")]
    roles: BTreeMap<String, Vec<String>>,
    /// Role name to the role names it implies.
    #[serde(default, deserialize_with = "string_list_map")]
    inherits: BTreeMap<String, Vec<String>>,
    /// Roles that must be present in `roles`.
    #[serde(default, deserialize_with = "string_list")]
    required_roles: Vec<String>,
}

impl TaxonomyConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role granted by any of the given groups.
    #[must_use]
    pub fn role<I, S>(mut self, role: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .insert(role.to_string(), groups.into_iter().map(Into::into).collect());
        self
    }

    /// Declares that `role` implies each of `implied`.
    #[must_use]
    pub fn inherits<I, S>(mut self, role: &str, implied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherits.insert(
            role.to_string(),
            implied.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Marks a role as required.
    #[must_use]
    pub fn require(mut self, role: &str) -> Self {
        self.required_roles.push(role.to_string());
        self
    }
}

/// Validated, immutable role taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTaxonomy {
    role_groups: BTreeMap<RoleName, BTreeSet<GroupId>>,
    inheritance: InheritanceTable,
    watched_groups: BTreeSet<GroupId>,
}

impl RoleTaxonomy {
    /// Validates the configuration and builds the taxonomy.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a role name or group id is invalid,
    /// a required role is missing, the inheritance table references an
    /// unknown role, or the inheritance table contains a cycle.
    pub fn load(config: &TaxonomyConfig) -> groupgate_core::Result<Self, ConfigurationError> {
        let mut role_groups = BTreeMap::new();
        for (name, groups) in &config.roles {
            let role = parse_role(name)?;
            let groups = groups
                .iter()
                .map(|group| {
                    group
                        .parse::<GroupId>()
                        .map_err(|e| ConfigurationError::InvalidGroupId {
                            role: role.to_string(),
                            group_id: group.clone(),
                            reason: e.reason,
                        })
                })
                .collect::<Result<BTreeSet<_>, _>>()?;

            if role_groups.insert(role.clone(), groups).is_some() {
                return Err(ConfigurationError::DuplicateRole {
                    role: role.to_string(),
                }
                .into());
            }
        }

        for name in &config.required_roles {
            let role = parse_role(name)?;
            if !role_groups.contains_key(&role) {
                return Err(ConfigurationError::MissingRequiredRole {
                    role: role.to_string(),
                }
                .into());
            }
        }

        let mut inheritance = InheritanceTable::new();
        for (name, implied) in &config.inherits {
            let role = parse_role(name)?;
            if !role_groups.contains_key(&role) {
                return Err(ConfigurationError::UnknownRole {
                    role: role.to_string(),
                    referenced_by: role.to_string(),
                }
                .into());
            }

            let entry = inheritance.entry(role.clone()).or_insert_with(BTreeSet::new);
            for implied_name in implied {
                let implied_role = parse_role(implied_name)?;
                if !role_groups.contains_key(&implied_role) {
                    return Err(ConfigurationError::UnknownRole {
                        role: implied_role.to_string(),
                        referenced_by: role.to_string(),
                    }
                    .into());
                }
                entry.insert(implied_role);
            }
        }

        ensure_acyclic(&inheritance)?;

        let watched_groups: BTreeSet<GroupId> =
            role_groups.values().flatten().copied().collect();

        debug!(
            roles = role_groups.len(),
            watched_groups = watched_groups.len(),
            "role taxonomy loaded"
        );

        Ok(Self {
            role_groups,
            inheritance,
            watched_groups,
        })
    }

    /// Returns the role to group mapping.
    #[must_use]
    pub fn role_groups(&self) -> &BTreeMap<RoleName, BTreeSet<GroupId>> {
        &self.role_groups
    }

    /// Returns the inheritance table.
    #[must_use]
    pub fn inheritance(&self) -> &InheritanceTable {
        &self.inheritance
    }

    /// Returns the deduplicated union of all configured group ids.
    #[must_use]
    pub fn watched_groups(&self) -> &BTreeSet<GroupId> {
        &self.watched_groups
    }
}

fn parse_role(name: &str) -> Result<RoleName, ConfigurationError> {
    RoleName::new(name).map_err(|e| ConfigurationError::InvalidRoleName {
        name: name.to_string(),
        reason: e.reason,
    })
}

fn ensure_acyclic(inheritance: &InheritanceTable) -> Result<(), ConfigurationError> {
    let mut graph = DiGraphMap::<&RoleName, ()>::new();
    for (role, implied) in inheritance {
        graph.add_node(role);
        for target in implied {
            if target == role {
                return Err(ConfigurationError::CyclicInheritance {
                    role: role.to_string(),
                });
            }
            graph.add_edge(role, target, ());
        }
    }

    petgraph::algo::toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| ConfigurationError::CyclicInheritance {
            role: cycle.node_id().to_string(),
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringList {
    List(Vec<String>),
    Joined(String),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    StringList::deserialize(deserializer).map(StringList::into_vec)
}

fn string_list_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, StringList>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, value.into_vec()))
        .collect())
}
