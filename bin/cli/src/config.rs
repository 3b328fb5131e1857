//! Command-line configuration.
//!
//! Loaded via the `config` crate from `HEADLESS_AUTH_*` environment
//! variables; nested fields use `__` (e.g. `HEADLESS_AUTH_ONBOARDING__ENABLED`).
//! Command-line flags override the namespace and base URL.

use headless_auth_authz::{DEFAULT_PERMISSIONS_PATH, FullAccessPolicy};
use headless_auth_core::Namespace;
use headless_auth_session::OnboardingConfig;
use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "HEADLESS_AUTH";

/// Client configuration composed from library configs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CliConfig {
    /// Base URL of the authentication API, without the version segment.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Namespace isolating this session's state.
    #[serde(default)]
    pub namespace: Namespace,

    /// Front-end origin used for provider callback URLs.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// File holding persisted session state.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Path of the permissions endpoint under the base URL.
    #[serde(default = "default_permissions_path")]
    pub permissions_path: String,

    /// Onboarding configuration.
    #[serde(default)]
    pub onboarding: OnboardingConfig,

    /// When permission checks bypass the snapshot.
    #[serde(default)]
    pub full_access: FullAccessPolicy,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_app_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".headless-auth").join("session.json")
}

fn default_permissions_path() -> String {
    DEFAULT_PERMISSIONS_PATH.to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            namespace: Namespace::default(),
            app_origin: default_app_origin(),
            storage_path: default_storage_path(),
            permissions_path: default_permissions_path(),
            onboarding: OnboardingConfig::default(),
            full_access: FullAccessPolicy::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its field.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, namespace: Option<Namespace>, api_base_url: Option<String>) -> Self {
        if let Some(namespace) = namespace {
            self.namespace = namespace;
        }
        if let Some(api_base_url) = api_base_url {
            self.api_base_url = api_base_url;
        }
        self
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("full_access.roles")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> CliConfig {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CliConfig::from_environment(environment().source(Some(source))).expect("config")
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]);
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.permissions_path, "/api/auth/permissions");
        assert_eq!(config.full_access, FullAccessPolicy::Always);
        assert!(!config.onboarding.enabled);
    }

    #[test]
    fn nested_fields_and_role_lists() {
        let config = load(&[
            ("HEADLESS_AUTH_API_BASE_URL", "https://auth.example.com"),
            ("HEADLESS_AUTH_NAMESPACE", "tenant"),
            ("HEADLESS_AUTH_ONBOARDING__ENABLED", "true"),
            ("HEADLESS_AUTH_FULL_ACCESS__MODE", "role_gated"),
            ("HEADLESS_AUTH_FULL_ACCESS__ROLES", "admin,owner"),
        ]);
        assert_eq!(config.api_base_url, "https://auth.example.com");
        assert_eq!(config.namespace.as_str(), "tenant");
        assert!(config.onboarding.enabled);
        assert_eq!(config.full_access, FullAccessPolicy::role_gated(["admin", "owner"]));
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let source = [("HEADLESS_AUTH_NAMESPACE".to_string(), "a:b".to_string())]
            .into_iter()
            .collect();
        assert!(CliConfig::from_environment(environment().source(Some(source))).is_err());
    }

    #[test]
    fn overrides_win() {
        let config = CliConfig::default().with_overrides(
            Some(Namespace::new("cli").expect("namespace")),
            Some("https://override.example.com".to_string()),
        );
        assert_eq!(config.namespace.as_str(), "cli");
        assert_eq!(config.api_base_url, "https://override.example.com");

        let unchanged = CliConfig::default().with_overrides(None, None);
        assert_eq!(unchanged, CliConfig::default());
    }
}
