//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConfigurationError`: Malformed role taxonomy (fatal at startup)
//! - `AuthorizationError`: Guard failures (per request)

use std::fmt;

/// Errors from loading the role taxonomy.
///
/// Any of these prevents the process from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A role name is empty or otherwise invalid.
    InvalidRoleName { name: String, reason: String },
    /// Two configured role names normalize to the same role.
    DuplicateRole { role: String },
    /// A group identifier is not a GUID.
    InvalidGroupId {
        role: String,
        group_id: String,
        reason: String,
    },
    /// A role listed as required has no entry in the taxonomy.
    MissingRequiredRole { role: String },
    /// The inheritance table references a role not in the taxonomy.
    UnknownRole { role: String, referenced_by: String },
    /// The inheritance table contains a cycle through the given role.
    CyclicInheritance { role: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRoleName { name, reason } => {
                write!(f, "invalid role name '{name}': {reason}")
            }
            Self::DuplicateRole { role } => {
                write!(f, "role '{role}' is configured more than once")
            }
            Self::InvalidGroupId {
                role,
                group_id,
                reason,
            } => {
                write!(
                    f,
                    "invalid group id '{group_id}' for role '{role}': {reason}"
                )
            }
            Self::MissingRequiredRole { role } => {
                write!(f, "required role '{role}' is not configured")
            }
            Self::UnknownRole {
                role,
                referenced_by,
            } => {
                write!(
                    f,
                    "inheritance for '{referenced_by}' references unknown role '{role}'"
                )
            }
            Self::CyclicInheritance { role } => {
                write!(f, "role inheritance contains a cycle through '{role}'")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors from guard evaluation.
///
/// `NotAuthenticated` and `Denied` are deliberately separate: the first
/// sends the caller to log in, the second is a hard rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No valid session is present.
    NotAuthenticated,
    /// The caller is authenticated but their roles do not satisfy the requirement.
    Denied { requirement: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => {
                write!(f, "user is not authenticated")
            }
            Self::Denied { requirement } => {
                write!(f, "roles do not satisfy requirement {requirement}")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_group_id_display() {
        let err = ConfigurationError::InvalidGroupId {
            role: "admin".to_string(),
            group_id: "not-a-guid".to_string(),
            reason: "invalid length".to_string(),
        };
        assert!(err.to_string().contains("not-a-guid"));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn cyclic_inheritance_display() {
        let err = ConfigurationError::CyclicInheritance {
            role: "support".to_string(),
        };
        assert!(err.to_string().contains("cycle"));
        assert!(err.to_string().contains("support"));
    }

    #[test]
    fn unknown_role_display() {
        let err = ConfigurationError::UnknownRole {
            role: "viewer".to_string(),
            referenced_by: "admin".to_string(),
        };
        assert!(err.to_string().contains("viewer"));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn authorization_error_not_authenticated_display() {
        let err = AuthorizationError::NotAuthenticated;
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn authorization_error_denied_display() {
        let err = AuthorizationError::Denied {
            requirement: "all of [admin]".to_string(),
        };
        assert!(err.to_string().contains("all of [admin]"));
    }
}
