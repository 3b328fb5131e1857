//! Response envelope types of the headless authentication API.
//!
//! Every response is `{status, data, meta?}`. The only fields that drive
//! local state are `meta.is_authenticated`, `meta.session_token` and, for
//! authenticated responses, `data.user.is_onboarded`.
//!
//! Authentication responses are decoded by their `status` into an explicit
//! [`AuthData`] variant rather than checked for the presence of a `user`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Whether the session is authenticated after this call.
    #[serde(default)]
    pub is_authenticated: bool,
    /// A new session token issued by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Generic `{status, data, meta?}` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<D> {
    /// Status echoed in the body.
    pub status: u16,
    /// Payload.
    pub data: D,
    /// Metadata, when the endpoint sends it.
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Bare `{status}` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
    /// Status echoed in the body.
    pub status: u16,
}

/// Identifiers of the authentication flows the API can report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowId {
    VerifyEmail,
    VerifyPhone,
    Login,
    LoginByCode,
    Signup,
    ProviderRedirect,
    ProviderSignup,
    ProviderToken,
    MfaAuthenticate,
    MfaTrust,
    Reauthenticate,
    MfaReauthenticate,
    WebauthnLogin,
    WebauthnSignup,
    WebauthnAuthenticate,
    WebauthnReauthenticate,
    PasswordReset,
    PasswordResetByCode,
    /// A flow this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Authenticator kinds, passed through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatorType {
    RecoveryCodes,
    Totp,
    Webauthn,
    #[serde(other)]
    Unknown,
}

/// A third-party identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub flows: Vec<String>,
}

/// One step of an authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    /// True for the flow the session is currently waiting on.
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<AuthenticatorType>,
}

/// The authenticated user as reported by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Whether the user finished onboarding.
    #[serde(default)]
    pub is_onboarded: bool,
    /// Where the front-end should go next.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Any other user fields (id, email, display name, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A method the user authenticated with during this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthMethod {
    /// `password`, `socialaccount`, `mfa`, `code`, ...
    pub method: String,
    /// Unix timestamp of the authentication.
    #[serde(default)]
    pub at: Option<f64>,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Payload of an authentication response.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthData {
    /// The session is authenticated.
    Authenticated {
        user: User,
        methods: Vec<AuthMethod>,
        flows: Vec<Flow>,
    },
    /// Not (or not yet) authenticated; `flows` lists what can happen next.
    Pending { flows: Vec<Flow> },
}

impl AuthData {
    /// Returns the user of an authenticated response.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Pending { .. } => None,
        }
    }

    /// Returns the flows reported with the response.
    #[must_use]
    pub fn flows(&self) -> &[Flow] {
        match self {
            Self::Authenticated { flows, .. } | Self::Pending { flows } => flows,
        }
    }

    /// Returns the flow the session is waiting on, if any.
    #[must_use]
    pub fn pending_flow(&self) -> Option<&Flow> {
        self.flows().iter().find(|flow| flow.is_pending)
    }
}

/// An authentication response (`AuthenticatedResponse`,
/// `AuthenticationResponse` or `NotAuthenticatedResponse`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawAuthResponse")]
pub struct AuthResponse {
    pub status: u16,
    pub data: AuthData,
    pub meta: Meta,
}

#[derive(Deserialize)]
struct RawAuthResponse {
    status: u16,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    meta: Meta,
}

#[derive(Deserialize)]
struct AuthenticatedPayload {
    user: User,
    #[serde(default)]
    methods: Vec<AuthMethod>,
    #[serde(default)]
    flows: Vec<Flow>,
}

#[derive(Deserialize)]
struct PendingPayload {
    #[serde(default)]
    flows: Vec<Flow>,
}

impl TryFrom<RawAuthResponse> for AuthResponse {
    type Error = String;

    fn try_from(raw: RawAuthResponse) -> Result<Self, Self::Error> {
        let data = match raw.status {
            200 => {
                let payload: AuthenticatedPayload =
                    serde_json::from_value(raw.data).map_err(|e| e.to_string())?;
                AuthData::Authenticated {
                    user: payload.user,
                    methods: payload.methods,
                    flows: payload.flows,
                }
            }
            401 => {
                let payload: PendingPayload = if raw.data.is_null() {
                    PendingPayload { flows: Vec::new() }
                } else {
                    serde_json::from_value(raw.data).map_err(|e| e.to_string())?
                };
                AuthData::Pending {
                    flows: payload.flows,
                }
            }
            other => return Err(format!("unexpected authentication status {other}")),
        };
        Ok(Self {
            status: raw.status,
            data,
            meta: raw.meta,
        })
    }
}

/// Account settings exposed by `/auth/config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfiguration {
    #[serde(default)]
    pub login_methods: Vec<String>,
    #[serde(default)]
    pub is_open_for_signup: bool,
    #[serde(default)]
    pub email_verification_by_code_enabled: bool,
    #[serde(default)]
    pub login_by_code_enabled: bool,
    #[serde(default)]
    pub login_by_password_enabled: bool,
    #[serde(default)]
    pub password_reset_by_code_enabled: bool,
}

/// Social account settings exposed by `/auth/config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SocialAccountConfiguration {
    #[serde(default)]
    pub providers: Vec<Provider>,
}

/// Server configuration returned by `/auth/config`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Configuration {
    pub account: AccountConfiguration,
    #[serde(default)]
    pub socialaccount: Option<SocialAccountConfiguration>,
    /// MFA settings, passed through opaquely.
    #[serde(default)]
    pub mfa: Option<serde_json::Value>,
    #[serde(default)]
    pub usersessions: Option<serde_json::Value>,
}

/// An email address of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// What the server allows for an email address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailCheck {
    pub email: String,
    #[serde(default)]
    pub login_by_code: bool,
    #[serde(default)]
    pub login_by_password: bool,
    #[serde(default)]
    pub signup_allowed: bool,
}

/// The address and user an email verification key belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailVerificationInfo {
    pub email: String,
    pub user: User,
}

/// A social account linked to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderAccount {
    pub uid: String,
    pub display: String,
    pub provider: Provider,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authenticated_response_decodes_to_authenticated_variant() {
        let body = json!({
            "status": 200,
            "data": {
                "user": {"id": 7, "email": "a@example.com", "is_onboarded": true},
                "methods": [{"method": "password", "at": 1700000000.5, "email": "a@example.com"}]
            },
            "meta": {"is_authenticated": true, "session_token": "tok"}
        });
        let response: AuthResponse = serde_json::from_value(body).expect("decode");
        assert!(response.meta.is_authenticated);
        assert_eq!(response.meta.session_token.as_deref(), Some("tok"));

        let user = response.data.user().expect("authenticated");
        assert!(user.is_onboarded);
        assert_eq!(user.extra.get("email"), Some(&json!("a@example.com")));
        match &response.data {
            AuthData::Authenticated { methods, flows, .. } => {
                assert_eq!(methods[0].method, "password");
                assert!(flows.is_empty());
            }
            AuthData::Pending { .. } => panic!("expected authenticated"),
        }
    }

    #[test]
    fn pending_response_lists_flows() {
        let body = json!({
            "status": 401,
            "data": {"flows": [
                {"id": "login"},
                {"id": "login_by_code", "is_pending": true},
                {"id": "some_future_flow"}
            ]},
            "meta": {"is_authenticated": false}
        });
        let response: AuthResponse = serde_json::from_value(body).expect("decode");
        assert!(response.data.user().is_none());
        assert_eq!(response.data.flows().len(), 3);
        assert_eq!(
            response.data.pending_flow().map(|f| &f.id),
            Some(&FlowId::LoginByCode)
        );
        assert_eq!(response.data.flows()[2].id, FlowId::Unknown);
    }

    #[test]
    fn authenticated_status_without_user_is_rejected() {
        let body = json!({"status": 200, "data": {"flows": []}, "meta": {"is_authenticated": true}});
        let result: Result<AuthResponse, _> = serde_json::from_value(body);
        assert!(result.is_err());
    }

    #[test]
    fn unexpected_status_is_rejected() {
        let body = json!({"status": 409, "data": {}});
        let err = serde_json::from_value::<AuthResponse>(body).unwrap_err();
        assert!(err.to_string().contains("unexpected authentication status 409"));
    }

    #[test]
    fn missing_meta_defaults_to_unauthenticated() {
        let body = json!({"status": 401, "data": {"flows": []}});
        let response: AuthResponse = serde_json::from_value(body).expect("decode");
        assert_eq!(response.meta, Meta::default());
    }

    #[test]
    fn configuration_decodes_partial_document() {
        let body = json!({
            "account": {"login_methods": ["email"], "login_by_code_enabled": true},
            "socialaccount": {"providers": [{"id": "github", "name": "GitHub", "flows": ["provider_redirect"]}]}
        });
        let config: Configuration = serde_json::from_value(body).expect("decode");
        assert!(config.account.login_by_code_enabled);
        assert!(!config.account.is_open_for_signup);
        let providers = &config.socialaccount.expect("social").providers;
        assert_eq!(providers[0].id, "github");
        assert!(config.mfa.is_none());
    }
}
