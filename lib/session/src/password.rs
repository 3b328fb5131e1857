//! Password reset and change.

use crate::coordinator::record_auth_state;
use crate::envelope::{AuthData, AuthResponse, Envelope, Flow, StatusResponse, User};
use crate::error::TransportError;
use crate::request::{PasswordChangeRequest, PasswordResetConfirmRequest, PasswordResetRequest};
use crate::transport::{RequestOptions, TransportClient};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Result of asking for a password reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// The reset message was sent.
    Sent,
    /// The server wants another step first (e.g. a reset code).
    Pending { flows: Vec<Flow> },
}

#[derive(Deserialize)]
struct ResetRequestBody {
    status: u16,
    #[serde(default)]
    data: Option<FlowsPayload>,
}

#[derive(Deserialize)]
struct FlowsPayload {
    #[serde(default)]
    flows: Vec<Flow>,
}

#[derive(Deserialize)]
struct ResetInfo {
    user: User,
}

/// Password management for one namespace.
pub struct PasswordManagement {
    transport: Arc<TransportClient>,
}

impl PasswordManagement {
    /// Creates a password helper on top of `transport`.
    #[must_use]
    pub fn new(transport: Arc<TransportClient>) -> Self {
        Self { transport }
    }

    /// Asks the server to send a password reset message.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn request_password_reset(
        &self,
        request: &PasswordResetRequest,
    ) -> Result<ResetRequestOutcome, Report<TransportError>> {
        let body: ResetRequestBody = self
            .transport
            .request(
                "/auth/password/request",
                RequestOptions::post().json(request)?.allow_unauthorized(),
            )
            .await?;
        Ok(match (body.status, body.data) {
            (401, Some(payload)) => ResetRequestOutcome::Pending {
                flows: payload.flows,
            },
            (401, None) => ResetRequestOutcome::Pending { flows: Vec::new() },
            _ => ResetRequestOutcome::Sent,
        })
    }

    /// Looks up the user a reset key belongs to.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged (an invalid key is an API error).
    #[instrument(skip_all)]
    pub async fn password_reset_info(&self, key: &str) -> Result<User, Report<TransportError>> {
        let envelope: Envelope<ResetInfo> = self
            .transport
            .request(
                "/auth/password/reset",
                RequestOptions::get().query("key", key),
            )
            .await?;
        Ok(envelope.data.user)
    }

    /// Sets a new password using a reset key.
    ///
    /// The response is an authentication response and is recorded like a login.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        request: &PasswordResetConfirmRequest,
    ) -> Result<AuthData, Report<TransportError>> {
        let response: AuthResponse = self
            .transport
            .request(
                "/auth/password/reset",
                RequestOptions::post().json(request)?.allow_unauthorized(),
            )
            .await?;
        record_auth_state(self.transport.store(), &response).await?;
        Ok(response.data)
    }

    /// Changes the password of the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        request: &PasswordChangeRequest,
    ) -> Result<(), Report<TransportError>> {
        let _: StatusResponse = self
            .transport
            .request(
                "/account/password/change",
                RequestOptions::post().json(request)?,
            )
            .await?;
        Ok(())
    }
}
