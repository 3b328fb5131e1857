//! Authentication operations and local session state.
//!
//! Each operation issues one call through the transport and then records
//! `meta.is_authenticated` (and, for an authenticated response, the user's
//! onboarding flag) in the credential store before returning.

use crate::config::OnboardingConfig;
use crate::envelope::{AuthData, AuthResponse, Configuration, Envelope, Flow};
use crate::error::TransportError;
use crate::request::{
    ConfirmLoginCodeRequest, LoginCodeRequest, LoginRequest, ReauthenticateRequest, SignupRequest,
};
use crate::store::CredentialStore;
use crate::transport::{RequestOptions, TransportClient};
use async_trait::async_trait;
use headless_auth_core::Namespace;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Something to run after a logout has cleared the local session flags.
#[async_trait]
pub trait LogoutHook: Send + Sync {
    /// Called once per logout, whether or not the remote call succeeded.
    async fn on_logout(&self, namespace: &Namespace);
}

/// Records the authentication state carried by `response` in `store`.
pub(crate) async fn record_auth_state(
    store: &CredentialStore,
    response: &AuthResponse,
) -> Result<(), Report<TransportError>> {
    store
        .set_authentication_status(response.meta.is_authenticated)
        .await
        .map_err(|e| TransportError::Storage {
            reason: e.to_string(),
        })?;
    match &response.data {
        AuthData::Authenticated { user, .. } => {
            store
                .set_onboarding_status(user.is_onboarded)
                .await
                .map_err(|e| TransportError::Storage {
                    reason: e.to_string(),
                })?;
        }
        AuthData::Pending { .. } => {}
    }
    debug!(
        is_authenticated = response.meta.is_authenticated,
        "recorded authentication state"
    );
    Ok(())
}

/// Login, signup, logout and status sync for one namespace.
pub struct SessionCoordinator {
    transport: Arc<TransportClient>,
    onboarding: OnboardingConfig,
    logout_hooks: Vec<Arc<dyn LogoutHook>>,
}

impl SessionCoordinator {
    /// Creates a coordinator on top of `transport`.
    #[must_use]
    pub fn new(transport: Arc<TransportClient>, onboarding: OnboardingConfig) -> Self {
        Self {
            transport,
            onboarding,
            logout_hooks: Vec::new(),
        }
    }

    /// Registers a hook run after every logout.
    #[must_use]
    pub fn with_logout_hook(mut self, hook: Arc<dyn LogoutHook>) -> Self {
        self.logout_hooks.push(hook);
        self
    }

    /// Returns the transport this coordinator uses.
    #[must_use]
    pub fn transport(&self) -> &Arc<TransportClient> {
        &self.transport
    }

    fn store(&self) -> &CredentialStore {
        self.transport.store()
    }

    /// Returns the current session token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store().session_token()
    }

    /// Returns whether the session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    /// Returns whether the user is onboarded; always true when onboarding
    /// is disabled.
    #[must_use]
    pub fn is_onboarded(&self) -> bool {
        self.onboarding.effective(self.store().is_onboarded())
    }

    /// Fetches the server's authentication configuration.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn configuration(&self) -> Result<Configuration, Report<TransportError>> {
        let envelope: Envelope<Configuration> = self
            .transport
            .request("/auth/config", RequestOptions::get())
            .await?;
        Ok(envelope.data)
    }

    /// Logs in with a password (or other credential).
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; local state is untouched then.
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthData, Report<TransportError>> {
        self.authenticate("/auth/login", RequestOptions::post().json(request)?)
            .await
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; local state is untouched then.
    #[instrument(skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthData, Report<TransportError>> {
        self.authenticate("/auth/signup", RequestOptions::post().json(request)?)
            .await
    }

    /// Confirms the password of an already authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; local state is untouched then.
    #[instrument(skip_all)]
    pub async fn reauthenticate(
        &self,
        request: &ReauthenticateRequest,
    ) -> Result<AuthData, Report<TransportError>> {
        self.authenticate("/auth/reauthenticate", RequestOptions::post().json(request)?)
            .await
    }

    /// Starts a login-by-code flow. Local state is not modified.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn request_login_code(
        &self,
        request: &LoginCodeRequest,
    ) -> Result<AuthData, Report<TransportError>> {
        let response: AuthResponse = self
            .transport
            .request(
                "/auth/code/request",
                RequestOptions::post().json(request)?.allow_unauthorized(),
            )
            .await?;
        Ok(response.data)
    }

    /// Completes a login-by-code flow.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; local state is untouched then.
    #[instrument(skip_all)]
    pub async fn confirm_login_code(
        &self,
        request: &ConfirmLoginCodeRequest,
    ) -> Result<AuthData, Report<TransportError>> {
        self.authenticate("/auth/code/confirm", RequestOptions::post().json(request)?)
            .await
    }

    /// Re-reads the authentication status from the server.
    ///
    /// "Not authenticated" is a normal result here, not an error.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    #[instrument(skip_all)]
    pub async fn sync_authentication_status(&self) -> Result<AuthData, Report<TransportError>> {
        self.authenticate("/auth/session", RequestOptions::get().allow_unauthorized())
            .await
    }

    /// Ends the session.
    ///
    /// The local authenticated and onboarded flags are cleared and the
    /// logout hooks run even if the remote call fails; the failure is
    /// returned afterwards. Returns the flows the server offers next, if
    /// it reported any.
    ///
    /// # Errors
    ///
    /// Returns the transport error, after local state has been cleared.
    #[instrument(skip_all, fields(namespace = %self.store().namespace()))]
    pub async fn logout(&self) -> Result<Vec<Flow>, Report<TransportError>> {
        let result: Result<serde_json::Value, _> = self
            .transport
            .request(
                "/auth/session",
                RequestOptions::delete().allow_unauthorized(),
            )
            .await;

        let store = self.store();
        let authenticated = store.set_authentication_status(false).await;
        let onboarded = store.set_onboarding_status(false).await;
        let cleared = authenticated.and(onboarded);
        for hook in &self.logout_hooks {
            hook.on_logout(store.namespace()).await;
        }
        debug!(remote_ok = result.is_ok(), "logged out");

        let body = result?;
        cleared.map_err(|e| TransportError::Storage {
            reason: e.to_string(),
        })?;
        Ok(body
            .pointer("/data/flows")
            .and_then(|flows| serde_json::from_value::<Vec<Flow>>(flows.clone()).ok())
            .unwrap_or_default())
    }

    async fn authenticate(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<AuthData, Report<TransportError>> {
        let response: AuthResponse = self.transport.request(path, options).await?;
        record_auth_state(self.store(), &response).await?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_disabled_reports_onboarded() {
        let store = Arc::new(CredentialStore::in_memory(Namespace::default()));
        let transport =
            Arc::new(TransportClient::new("https://auth.test", store).expect("client"));
        let coordinator = SessionCoordinator::new(Arc::clone(&transport), OnboardingConfig::default());
        assert!(coordinator.is_onboarded());
        assert!(!coordinator.is_authenticated());
        assert_eq!(coordinator.token(), None);

        let gated = SessionCoordinator::new(transport, OnboardingConfig::enabled());
        assert!(!gated.is_onboarded());
    }
}
