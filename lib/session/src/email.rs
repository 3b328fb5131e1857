//! Email address management and verification.

use crate::coordinator::record_auth_state;
use crate::envelope::{
    AuthData, AuthResponse, EmailAddress, EmailCheck, EmailVerificationInfo, Envelope,
    StatusResponse,
};
use crate::error::TransportError;
use crate::request::{EmailAddressRequest, EmailPrimaryRequest, EmailVerificationRequest};
use crate::transport::{RequestOptions, TransportClient};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::instrument;

/// Result of a verification call.
///
/// The server may answer with a bare `{status}`; that is a success with
/// nothing further to report.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome<T> {
    /// Accepted, no payload.
    Success,
    /// Accepted with a payload.
    Data(T),
}

/// Email management for one namespace.
pub struct EmailManagement {
    transport: Arc<TransportClient>,
}

impl EmailManagement {
    /// Creates an email helper on top of `transport`.
    #[must_use]
    pub fn new(transport: Arc<TransportClient>) -> Self {
        Self { transport }
    }

    /// Lists the user's email addresses.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn email_addresses(&self) -> Result<Vec<EmailAddress>, Report<TransportError>> {
        let envelope: Envelope<Vec<EmailAddress>> = self
            .transport
            .request("/account/email", RequestOptions::get())
            .await?;
        Ok(envelope.data)
    }

    /// Adds an email address. Returns the updated list.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn add_email(
        &self,
        request: &EmailAddressRequest,
    ) -> Result<Vec<EmailAddress>, Report<TransportError>> {
        self.update("/account/email", RequestOptions::post().json(request)?)
            .await
    }

    /// Asks what the server allows for an address (login, signup).
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn check_email(
        &self,
        request: &EmailAddressRequest,
    ) -> Result<EmailCheck, Report<TransportError>> {
        let envelope: Envelope<EmailCheck> = self
            .transport
            .request("/auth/email/check", RequestOptions::post().json(request)?)
            .await?;
        Ok(envelope.data)
    }

    /// Removes an email address. Returns the updated list.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn delete_email(
        &self,
        request: &EmailAddressRequest,
    ) -> Result<Vec<EmailAddress>, Report<TransportError>> {
        self.update("/account/email", RequestOptions::delete().json(request)?)
            .await
    }

    /// Makes an address the primary one. Returns the updated list.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn mark_email_as_primary(
        &self,
        request: &EmailAddressRequest,
    ) -> Result<Vec<EmailAddress>, Report<TransportError>> {
        let request = EmailPrimaryRequest {
            email: request.email.clone(),
            primary: true,
        };
        self.update("/account/email", RequestOptions::patch().json(&request)?)
            .await
    }

    /// Sends a verification message to an address.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn request_email_verification(
        &self,
        request: &EmailAddressRequest,
    ) -> Result<VerificationOutcome<serde_json::Value>, Report<TransportError>> {
        let body: Option<serde_json::Value> = self
            .transport
            .request("/account/email", RequestOptions::put().json(request)?)
            .await?;
        Ok(match body {
            Some(serde_json::Value::Object(mut body)) => match body.remove("data") {
                Some(data) => VerificationOutcome::Data(data),
                None => VerificationOutcome::Success,
            },
            _ => VerificationOutcome::Success,
        })
    }

    /// Looks up the address a verification key belongs to.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged (an invalid key is an API error).
    #[instrument(skip_all)]
    pub async fn email_verification_info(
        &self,
        key: &str,
    ) -> Result<EmailVerificationInfo, Report<TransportError>> {
        let envelope: Envelope<EmailVerificationInfo> = self
            .transport
            .request("/auth/email/verify", RequestOptions::get().query("key", key))
            .await?;
        Ok(envelope.data)
    }

    /// Confirms an address with a verification key.
    ///
    /// An authentication response is recorded like a login; a 401 means the
    /// address was verified but the session is not logged in.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn verify_email(
        &self,
        request: &EmailVerificationRequest,
    ) -> Result<VerificationOutcome<AuthData>, Report<TransportError>> {
        let body: Option<serde_json::Value> = self
            .transport
            .request(
                "/auth/email/verify",
                RequestOptions::post().json(request)?.allow_unauthorized(),
            )
            .await?;
        let Some(body) = body.filter(|body| body.get("data").is_some()) else {
            return Ok(VerificationOutcome::Success);
        };
        let response: AuthResponse =
            serde_json::from_value(body).map_err(|e| TransportError::Decode {
                reason: e.to_string(),
            })?;
        record_auth_state(self.transport.store(), &response).await?;
        Ok(VerificationOutcome::Data(response.data))
    }

    /// Sends the pending verification message again.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn resend_email_verification(&self) -> Result<(), Report<TransportError>> {
        let _: StatusResponse = self
            .transport
            .request("/auth/email/verify/resend", RequestOptions::post())
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Vec<EmailAddress>, Report<TransportError>> {
        let envelope: Envelope<Vec<EmailAddress>> = self.transport.request(path, options).await?;
        Ok(envelope.data)
    }
}
