//! Authorization queries against the last fetched snapshot.

use crate::error::AuthzError;
use crate::policy::FullAccessPolicy;
use crate::source::PermissionSource;
use crate::types::{AuthorizationSnapshot, PermissionKey};
use async_trait::async_trait;
use headless_auth_core::Namespace;
use headless_auth_session::LogoutHook;
use rootcause::prelude::Report;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Answers role and permission queries for one namespace.
///
/// Before the first [`refresh`](Self::refresh) there is no snapshot and
/// every role query is false. Permission queries are false too unless the
/// full-access policy grants them.
pub struct AuthorizationEvaluator {
    namespace: Namespace,
    source: Arc<dyn PermissionSource>,
    policy: FullAccessPolicy,
    snapshot: watch::Sender<Option<Arc<AuthorizationSnapshot>>>,
}

impl AuthorizationEvaluator {
    /// Creates an evaluator with no snapshot.
    #[must_use]
    pub fn new(
        namespace: Namespace,
        source: Arc<dyn PermissionSource>,
        policy: FullAccessPolicy,
    ) -> Self {
        Self {
            namespace,
            source,
            policy,
            snapshot: watch::Sender::new(None),
        }
    }

    /// Returns the namespace this evaluator belongs to.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Fetches a new snapshot and replaces the current one wholesale.
    ///
    /// On failure the previous snapshot is kept.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn refresh(&self) -> Result<Arc<AuthorizationSnapshot>, Report<AuthzError>> {
        let snapshot = Arc::new(self.source.fetch_snapshot().await?);
        self.replace(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Replaces the current snapshot.
    pub fn replace(&self, snapshot: Arc<AuthorizationSnapshot>) {
        debug!(
            roles = snapshot.roles.len(),
            resources = snapshot.permissions.len(),
            "replaced authorization snapshot"
        );
        self.snapshot.send_replace(Some(snapshot));
    }

    /// Drops the current snapshot.
    pub fn clear(&self) {
        if self.snapshot.send_replace(None).is_some() {
            debug!(namespace = %self.namespace, "cleared authorization snapshot");
        }
    }

    /// Returns the current snapshot, if one has been fetched.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<AuthorizationSnapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<AuthorizationSnapshot>>> {
        self.snapshot.subscribe()
    }

    /// Returns true if the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.snapshot
            .borrow()
            .as_ref()
            .is_some_and(|snapshot| snapshot.has_role(role))
    }

    /// Returns true if the user holds any of `roles`. False when the user
    /// has no roles at all.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.with_roles(|snapshot| roles.iter().any(|role| snapshot.has_role(role.as_ref())))
    }

    /// Returns true if the user holds all of `roles`. False when the user
    /// has no roles at all, even for an empty `roles`.
    #[must_use]
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.with_roles(|snapshot| roles.iter().all(|role| snapshot.has_role(role.as_ref())))
    }

    /// Returns true if permission queries bypass the snapshot.
    #[must_use]
    pub fn has_full_access(&self) -> bool {
        self.policy.grants(self.snapshot.borrow().as_deref())
    }

    /// Evaluates a `resource` or `resource.action` permission.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.has_full_access() {
            return true;
        }
        let key = PermissionKey::parse(permission);
        self.snapshot
            .borrow()
            .as_ref()
            .is_some_and(|snapshot| snapshot.allows(&key))
    }

    /// Returns true if any of `permissions` is granted.
    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        if self.has_full_access() {
            return true;
        }
        self.with_snapshot(|snapshot| {
            permissions
                .iter()
                .any(|p| snapshot.allows(&PermissionKey::parse(p.as_ref())))
        })
    }

    /// Returns true if all of `permissions` are granted.
    #[must_use]
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        if self.has_full_access() {
            return true;
        }
        self.with_snapshot(|snapshot| {
            permissions
                .iter()
                .all(|p| snapshot.allows(&PermissionKey::parse(p.as_ref())))
        })
    }

    /// Checks a permission and returns an error if denied.
    pub fn require_permission(&self, permission: &str) -> Result<(), Report<AuthzError>> {
        if !self.has_permission(permission) {
            return Err(AuthzError::PermissionDenied {
                permission: permission.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn with_snapshot(&self, f: impl FnOnce(&AuthorizationSnapshot) -> bool) -> bool {
        self.snapshot.borrow().as_deref().is_some_and(f)
    }

    fn with_roles(&self, f: impl FnOnce(&AuthorizationSnapshot) -> bool) -> bool {
        self.with_snapshot(|snapshot| !snapshot.roles.is_empty() && f(snapshot))
    }
}

#[async_trait]
impl LogoutHook for AuthorizationEvaluator {
    async fn on_logout(&self, namespace: &Namespace) {
        if namespace == &self.namespace {
            self.clear();
        }
    }
}
