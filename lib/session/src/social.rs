//! Social (third-party provider) authentication.
//!
//! `connect` is a navigation side effect: it builds a same-origin form that
//! posts to the API's provider-redirect endpoint and hands it to a
//! [`Navigator`]. The outcome arrives later through `callback`.

use crate::coordinator::record_auth_state;
use crate::envelope::{AuthData, AuthResponse, Envelope, ProviderAccount};
use crate::error::TransportError;
use crate::request::ProviderDisconnectRequest;
use crate::transport::{RequestOptions, TransportClient};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Why the user is being sent to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderProcess {
    /// Log in (or sign up) with the provider.
    #[default]
    Login,
    /// Link the provider account to the current user.
    Connect,
}

impl ProviderProcess {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Connect => "connect",
        }
    }
}

impl fmt::Display for ProviderProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A form to submit by navigating the user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectForm {
    /// Absolute URL the form posts to.
    pub action: String,
    /// Always `POST`.
    pub method: &'static str,
    /// Hidden input fields, in submission order.
    pub fields: Vec<(String, String)>,
}

impl RedirectForm {
    /// Returns the value of the field named `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Submits redirect forms on behalf of the user.
pub trait Navigator: Send + Sync {
    /// Submits `form`. Fire-and-forget.
    fn submit(&self, form: RedirectForm);
}

/// Provider login, callback and account linking for one namespace.
pub struct SocialAuth {
    transport: Arc<TransportClient>,
    navigator: Arc<dyn Navigator>,
    app_origin: String,
}

impl SocialAuth {
    /// Creates a social auth helper.
    ///
    /// `app_origin` is the front-end origin used to build default callback URLs.
    #[must_use]
    pub fn new(
        transport: Arc<TransportClient>,
        navigator: Arc<dyn Navigator>,
        app_origin: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            navigator,
            app_origin: app_origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the default callback URL for `provider`.
    #[must_use]
    pub fn default_callback_url(&self, provider: &str) -> String {
        format!("{}/auth/callback/{provider}", self.app_origin)
    }

    /// Sends the user to `provider`.
    pub fn connect(&self, provider: &str, callback_url: Option<String>, process: Option<ProviderProcess>) {
        let callback_url = callback_url.unwrap_or_else(|| self.default_callback_url(provider));
        let form = RedirectForm {
            action: self.transport.endpoint("/auth/provider/redirect"),
            method: "POST",
            fields: vec![
                ("process".to_string(), process.unwrap_or_default().to_string()),
                ("provider".to_string(), provider.to_string()),
                ("callback_url".to_string(), callback_url),
            ],
        };
        self.navigator.submit(form);
    }

    /// Completes a provider login with the payload the provider returned.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; local state is untouched then.
    #[instrument(skip(self, payload))]
    pub async fn callback(
        &self,
        provider: &str,
        payload: &serde_json::Value,
    ) -> Result<AuthData, Report<TransportError>> {
        let path = format!("/auth/provider/callback/{provider}");
        let response: AuthResponse = self
            .transport
            .request(&path, RequestOptions::post().json(payload)?)
            .await?;
        record_auth_state(self.transport.store(), &response).await?;
        Ok(response.data)
    }

    /// Lists the social accounts linked to the current user.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn provider_accounts(&self) -> Result<Vec<ProviderAccount>, Report<TransportError>> {
        let envelope: Envelope<Vec<ProviderAccount>> = self
            .transport
            .request("/account/providers", RequestOptions::get())
            .await?;
        Ok(envelope.data)
    }

    /// Unlinks a social account. Returns the remaining linked accounts.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip(self))]
    pub async fn disconnect(
        &self,
        provider: &str,
        account: &str,
    ) -> Result<Vec<ProviderAccount>, Report<TransportError>> {
        let request = ProviderDisconnectRequest {
            provider: provider.to_string(),
            account: account.to_string(),
        };
        let envelope: Envelope<Vec<ProviderAccount>> = self
            .transport
            .request("/account/providers", RequestOptions::delete().json(&request)?)
            .await?;
        Ok(envelope.data)
    }
}
