//! Full-access policy.

use crate::types::AuthorizationSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decides when permission queries bypass the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FullAccessPolicy {
    /// Every permission query is granted.
    #[default]
    Always,
    /// Permission queries are granted when the user holds any of `roles`.
    RoleGated {
        #[serde(default)]
        roles: BTreeSet<String>,
    },
}

impl FullAccessPolicy {
    /// Creates a role-gated policy.
    #[must_use]
    pub fn role_gated<I>(roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::RoleGated {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `snapshot` grants full access under this policy.
    #[must_use]
    pub fn grants(&self, snapshot: Option<&AuthorizationSnapshot>) -> bool {
        match self {
            Self::Always => true,
            Self::RoleGated { roles } => snapshot
                .is_some_and(|snapshot| roles.iter().any(|role| snapshot.has_role(role))),
        }
    }
}
