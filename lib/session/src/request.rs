//! Request payloads sent to the authentication API.

use serde::Serialize;
use serde_json::{Map, Value};

/// Credentials for `/auth/login`. Exactly one identifier is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Email and password login.
    #[must_use]
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Username and password login.
    #[must_use]
    pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

/// Payload for `/auth/signup`. Extra fields are sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for `/auth/reauthenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReauthenticateRequest {
    pub password: String,
}

/// Payload for `/auth/code/request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCodeRequest {
    pub email: String,
}

/// Payload for `/auth/code/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmLoginCodeRequest {
    pub code: String,
}

/// Payload for `/auth/password/request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Payload for `/auth/password/reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetConfirmRequest {
    pub key: String,
    pub password: String,
}

/// Payload for `/account/password/change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Payload for disconnecting a social account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDisconnectRequest {
    pub provider: String,
    pub account: String,
}

/// Payload naming one email address (`/account/email`, `/auth/email/check`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddressRequest {
    pub email: String,
}

/// Payload for changing the primary email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailPrimaryRequest {
    pub email: String,
    pub primary: bool,
}

/// Payload for `/auth/email/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailVerificationRequest {
    pub key: String,
}
