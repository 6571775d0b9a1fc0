//! Caller identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role attached to an identity.
///
/// Roles arrive as strings from identity sources. Anything outside the known
/// set is kept verbatim as [`Role::Unrecognized`] so it can be logged, and it
/// is always denied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Full control, including master key rotation and data key deletion.
    Admin,
    /// Application services: generate data keys, encrypt and decrypt.
    Service,
    /// Read-only reviewers; none of the key operations.
    Auditor,
    /// A role string this deployment does not know.
    Unrecognized(String),
}

impl Role {
    /// Parses a role name. Matching is exact (`ADMIN`, `SERVICE`, `AUDITOR`).
    pub fn parse(s: &str) -> Self {
        match s {
            "ADMIN" => Self::Admin,
            "SERVICE" => Self::Service,
            "AUDITOR" => Self::Auditor,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Returns the role name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "ADMIN",
            Self::Service => "SERVICE",
            Self::Auditor => "AUDITOR",
            Self::Unrecognized(s) => s,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// An authenticated caller.
///
/// Resolved by an [`crate::AuthBackend`] and passed explicitly into every
/// operation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable principal identifier (JWT `sub`, `root`, ...).
    pub principal: String,
    /// The principal's role.
    pub role: Role,
}

impl Identity {
    /// Creates an identity.
    pub fn new(principal: impl Into<String>, role: Role) -> Self {
        Self {
            principal: principal.into(),
            role,
        }
    }

    /// Creates the root identity (root token holders).
    pub fn root() -> Self {
        Self::new("root", Role::Admin)
    }

    /// Checks if this is the root identity.
    pub fn is_root(&self) -> bool {
        self.principal == "root" && self.role == Role::Admin
    }
}
