//! Strongly-typed identifiers for groups and roles.
//!
//! Group identifiers are GUIDs issued by the identity provider. They are
//! normalized to the lowercase hyphenated form, which is what the provider
//! expects on the wire. Role names are free-form labels normalized to
//! trimmed lowercase so that `Admin` and `admin` name the same role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Identifier of an identity-provider group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for GroupId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ParseIdError {
                id_type: "GroupId",
                reason: format!("'{s}' is not a GUID: {e}"),
            })
    }
}

/// Name of a role in the configured taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Creates a role name, normalizing it to trimmed lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty after trimming.
    pub fn new(name: &str) -> Result<Self, ParseIdError> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ParseIdError {
                id_type: "RoleName",
                reason: "role name is empty".to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// Creates a role name from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty after trimming.
    #[must_use]
    pub fn from_static(name: &'static str) -> Self {
        match Self::new(name) {
            Ok(role) => role,
            Err(e) => panic!("invalid role name literal: {e}"),
        }
    }

    /// Returns the role name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoleName {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<RoleName> for String {
    fn from(role: RoleName) -> Self {
        role.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
