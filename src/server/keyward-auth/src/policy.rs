//! Role-based authorization.
//!
//! Authorization is a table lookup over `Role x Action`. Adding a role or
//! changing what a role may do is an edit to [`STANDARD_GRANTS`], not to
//! control flow. Anything the table does not grant is denied.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::identity::Role;

/// Operations that can be authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create and wrap a new data key.
    GenerateDataKey,
    /// Encrypt a payload under a stored data key.
    Encrypt,
    /// Decrypt a payload under a stored data key.
    Decrypt,
    /// Rotate the active master key.
    RotateMasterKey,
    /// Delete a stored wrapped data key.
    DeleteDataKey,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 5] = [
        Action::GenerateDataKey,
        Action::Encrypt,
        Action::Decrypt,
        Action::RotateMasterKey,
        Action::DeleteDataKey,
    ];

    /// Returns the action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateDataKey => "GENERATE_DATA_KEY",
            Self::Encrypt => "ENCRYPT",
            Self::Decrypt => "DECRYPT",
            Self::RotateMasterKey => "ROTATE_MASTER_KEY",
            Self::DeleteDataKey => "DELETE_DATA_KEY",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants of the standard policy, keyed by role name.
pub const STANDARD_GRANTS: &[(&str, &[Action])] = &[
    ("ADMIN", &Action::ALL),
    (
        "SERVICE",
        &[Action::GenerateDataKey, Action::Encrypt, Action::Decrypt],
    ),
    ("AUDITOR", &[]),
];

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The role is not in the policy at all.
    UnknownRole,
    /// The role exists but is not granted this action.
    NotPermitted {
        /// The role that asked.
        role: Role,
    },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRole => write!(f, "unknown role"),
            Self::NotPermitted { role } => write!(f, "action not authorized for {role} role"),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action must not proceed.
    Deny(DenyReason),
}

impl Decision {
    /// Returns true for [`Decision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts a deny into [`AuthError::PermissionDenied`] for `action`.
    pub fn into_result(self, action: Action) -> Result<(), AuthError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(AuthError::PermissionDenied { action, reason }),
        }
    }
}

/// A role to allowed-actions table.
#[derive(Debug, Clone)]
pub struct Policy {
    grants: HashMap<Role, HashSet<Action>>,
}

impl Policy {
    /// Builds a policy from `(role name, actions)` pairs.
    pub fn from_grants<'a, I>(grants: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [Action])>,
    {
        let grants = grants
            .into_iter()
            .map(|(role, actions)| (Role::parse(role), actions.iter().copied().collect()))
            .collect();
        Self { grants }
    }

    /// The standard Keyward policy ([`STANDARD_GRANTS`]).
    pub fn standard() -> Self {
        Self::from_grants(STANDARD_GRANTS.iter().copied())
    }

    /// Decides whether `role` may perform `action`.
    ///
    /// Pure and total: every input yields a decision, and anything not
    /// explicitly granted is denied.
    pub fn authorize(&self, role: &Role, action: Action) -> Decision {
        match self.grants.get(role) {
            None => Decision::Deny(DenyReason::UnknownRole),
            Some(allowed) if allowed.contains(&action) => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::NotPermitted { role: role.clone() }),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_policy() -> &'static Policy {
    static POLICY: OnceLock<Policy> = OnceLock::new();
    POLICY.get_or_init(Policy::standard)
}

/// Decides `role` x `action` under the standard policy.
pub fn authorize(role: &Role, action: Action) -> Decision {
    standard_policy().authorize(role, action)
}
