//! Where permission snapshots come from.

use crate::error::AuthzError;
use crate::types::AuthorizationSnapshot;
use async_trait::async_trait;
use headless_auth_session::{RequestOptions, TransportClient};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::instrument;

/// Default path of the permissions endpoint, relative to the API base URL.
pub const DEFAULT_PERMISSIONS_PATH: &str = "/api/auth/permissions";

/// Fetches the full `{roles, permissions}` snapshot.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Fetches the current snapshot.
    async fn fetch_snapshot(&self) -> Result<AuthorizationSnapshot, Report<AuthzError>>;
}

/// Fetches snapshots from the server with the session token attached.
pub struct RemotePermissionSource {
    transport: Arc<TransportClient>,
    path: String,
}

impl RemotePermissionSource {
    /// Creates a source reading [`DEFAULT_PERMISSIONS_PATH`].
    #[must_use]
    pub fn new(transport: Arc<TransportClient>) -> Self {
        Self::with_path(transport, DEFAULT_PERMISSIONS_PATH)
    }

    /// Creates a source reading `path` under the unversioned base URL.
    #[must_use]
    pub fn with_path(transport: Arc<TransportClient>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

#[async_trait]
impl PermissionSource for RemotePermissionSource {
    #[instrument(skip(self), fields(path = %self.path))]
    async fn fetch_snapshot(&self) -> Result<AuthorizationSnapshot, Report<AuthzError>> {
        let snapshot: AuthorizationSnapshot = self
            .transport
            .request_root(&self.path, RequestOptions::get())
            .await
            .map_err(|e| AuthzError::FetchFailed {
                details: e.to_string(),
            })?;
        Ok(snapshot)
    }
}
