//! Authorization snapshot and permission keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Separator between the resource and action of a compound permission key.
const SEPARATOR: char = '.';

/// Roles and permissions of the current user, as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSnapshot {
    /// Role names.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// resource -> action -> allowed.
    #[serde(default)]
    pub permissions: BTreeMap<String, BTreeMap<String, bool>>,
}

impl AuthorizationSnapshot {
    /// Creates a snapshot from roles and `(resource, action, allowed)` entries.
    #[must_use]
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator<Item = (&'static str, &'static str, bool)>,
    {
        let mut map: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
        for (resource, action, allowed) in permissions {
            map.entry(resource.to_string())
                .or_default()
                .insert(action.to_string(), allowed);
        }
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: map,
        }
    }

    /// Returns true if the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Evaluates `key` against the permission map.
    ///
    /// A compound key needs that exact action mapped to true. A resource-only
    /// key needs any action under the resource mapped to true.
    #[must_use]
    pub fn allows(&self, key: &PermissionKey) -> bool {
        if self.permissions.is_empty() {
            return false;
        }
        match key {
            PermissionKey::Action { resource, action } => self
                .permissions
                .get(resource)
                .and_then(|actions| actions.get(action))
                .copied()
                .unwrap_or(false),
            PermissionKey::Resource(resource) => self
                .permissions
                .get(resource)
                .is_some_and(|actions| actions.values().any(|allowed| *allowed)),
            PermissionKey::Malformed => false,
        }
    }
}

/// A parsed permission query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionKey {
    /// `resource`: any action under the resource.
    Resource(String),
    /// `resource.action`.
    Action {
        /// Resource segment.
        resource: String,
        /// Action segment.
        action: String,
    },
    /// Empty input, or a compound key with an empty segment.
    Malformed,
}

impl PermissionKey {
    /// Parses a permission key. Only the first two segments of a compound
    /// key are used; anything after a second separator is ignored.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        if input.is_empty() {
            return Self::Malformed;
        }
        let mut segments = input.split(SEPARATOR);
        let resource = segments.next().unwrap_or_default();
        match segments.next() {
            None => Self::Resource(resource.to_string()),
            Some(action) if !resource.is_empty() && !action.is_empty() => Self::Action {
                resource: resource.to_string(),
                action: action.to_string(),
            },
            Some(_) => Self::Malformed,
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(resource) => write!(f, "{resource}"),
            Self::Action { resource, action } => write!(f, "{resource}{SEPARATOR}{action}"),
            Self::Malformed => write!(f, "<malformed>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn billing() -> AuthorizationSnapshot {
        AuthorizationSnapshot::new(
            ["member"],
            [("billing", "view", true), ("billing", "edit", false), ("reports", "export", false)],
        )
    }

    #[test]
    fn parse_keys() {
        assert_eq!(
            PermissionKey::parse("billing"),
            PermissionKey::Resource("billing".to_string())
        );
        assert_eq!(
            PermissionKey::parse("billing.view"),
            PermissionKey::Action {
                resource: "billing".to_string(),
                action: "view".to_string(),
            }
        );
        assert_eq!(
            PermissionKey::parse("billing.view.extra"),
            PermissionKey::parse("billing.view")
        );
        assert_eq!(PermissionKey::parse(""), PermissionKey::Malformed);
        assert_eq!(PermissionKey::parse("."), PermissionKey::Malformed);
        assert_eq!(PermissionKey::parse("billing."), PermissionKey::Malformed);
        assert_eq!(PermissionKey::parse(".view"), PermissionKey::Malformed);
    }

    #[test]
    fn compound_key_needs_that_action() {
        let snapshot = billing();
        assert!(snapshot.allows(&PermissionKey::parse("billing.view")));
        assert!(!snapshot.allows(&PermissionKey::parse("billing.edit")));
        assert!(!snapshot.allows(&PermissionKey::parse("billing.delete")));
        assert!(!snapshot.allows(&PermissionKey::parse("unknown.view")));
    }

    #[test]
    fn resource_key_needs_any_action() {
        let snapshot = billing();
        assert!(snapshot.allows(&PermissionKey::parse("billing")));
        assert!(!snapshot.allows(&PermissionKey::parse("reports")));
        assert!(!snapshot.allows(&PermissionKey::parse("unknown")));
    }

    #[test]
    fn empty_permissions_allow_nothing() {
        let snapshot = AuthorizationSnapshot::new(["admin"], []);
        assert!(!snapshot.allows(&PermissionKey::parse("billing")));
        assert!(snapshot.has_role("admin"));
    }

    #[test]
    fn snapshot_decodes_with_missing_sections() {
        let snapshot: AuthorizationSnapshot =
            serde_json::from_str(r#"{"roles": ["member"]}"#).expect("decode");
        assert!(snapshot.has_role("member"));
        assert!(snapshot.permissions.is_empty());

        let snapshot: AuthorizationSnapshot = serde_json::from_str(
            r#"{"roles": [], "permissions": {"billing": {"view": true}}}"#,
        )
        .expect("decode");
        assert!(snapshot.allows(&PermissionKey::parse("billing.view")));
    }

    #[test]
    fn display_round_trips_valid_keys() {
        assert_eq!(PermissionKey::parse("billing.view").to_string(), "billing.view");
        assert_eq!(PermissionKey::parse("billing").to_string(), "billing");
    }
}
