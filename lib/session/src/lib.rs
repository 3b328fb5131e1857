//! Client-side session management for a headless authentication API.
//!
//! This crate provides:
//! - Namespaced credential storage (`CredentialStore`, `StoreRegistry`)
//!   over pluggable backends (`MemoryStorage`, `FileStorage`)
//! - The HTTP transport that attaches, rotates and expires the session
//!   token (`TransportClient`, `TransportRegistry`)
//! - Authentication operations that keep local state in sync
//!   (`SessionCoordinator`, `SocialAuth`, `PasswordManagement`,
//!   `EmailManagement`)
//!
//! # Example
//!
//! ```no_run
//! use headless_auth_core::Namespace;
//! use headless_auth_session::{
//!     LoginRequest, OnboardingConfig, SessionCoordinator, StoreRegistry, TransportRegistry,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = TransportRegistry::new(StoreRegistry::in_memory());
//! let transport = registry
//!     .client(&Namespace::default(), "https://auth.example.com/_allauth/app")
//!     .await
//!     .map_err(|e| e.to_string())?;
//!
//! let session = SessionCoordinator::new(transport, OnboardingConfig::default());
//! session
//!     .login(&LoginRequest::email("alice@example.com", "correct horse"))
//!     .await
//!     .map_err(|e| e.to_string())?;
//!
//! assert!(session.is_authenticated());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod email;
pub mod envelope;
pub mod error;
pub mod password;
pub mod request;
pub mod social;
pub mod storage;
pub mod store;
pub mod transport;

// Re-export main types at crate root
pub use config::OnboardingConfig;
pub use coordinator::{LogoutHook, SessionCoordinator};
pub use email::{EmailManagement, VerificationOutcome};
pub use envelope::{
    AuthData, AuthMethod, AuthResponse, AuthenticatorType, Configuration, EmailAddress, EmailCheck,
    EmailVerificationInfo, Envelope, Flow, FlowId, Meta, Provider, ProviderAccount, StatusResponse,
    User,
};
pub use error::{ApiError, ErrorDetail, RateLimit, StorageError, TransportError};
pub use password::{PasswordManagement, ResetRequestOutcome};
pub use request::{
    ConfirmLoginCodeRequest, EmailAddressRequest, EmailPrimaryRequest, EmailVerificationRequest,
    LoginCodeRequest, LoginRequest, PasswordChangeRequest,
    PasswordResetConfirmRequest, PasswordResetRequest, ProviderDisconnectRequest,
    ReauthenticateRequest, SignupRequest,
};
pub use social::{Navigator, ProviderProcess, RedirectForm, SocialAuth};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{CredentialStore, StoreRegistry};
pub use transport::{
    RequestBody, RequestOptions, SESSION_TOKEN_HEADER, TransportClient, TransportRegistry,
    UnauthorizedPolicy,
};
