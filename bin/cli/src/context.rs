//! Per-namespace wiring of the session and authorization components.

use crate::config::CliConfig;
use crate::error::CliError;
use headless_auth_authz::{AuthorizationEvaluator, RemotePermissionSource};
use headless_auth_session::{
    FileStorage, LogoutHook, Navigator, PasswordManagement, RedirectForm, SessionCoordinator,
    SocialAuth, StoreRegistry, TransportRegistry,
};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::info;

/// Everything one namespace needs to authenticate and authorize.
pub struct AuthContext {
    pub coordinator: SessionCoordinator,
    pub evaluator: Arc<AuthorizationEvaluator>,
    pub social: SocialAuth,
    pub passwords: PasswordManagement,
}

impl AuthContext {
    /// Builds the context for `config.namespace` and `config.api_base_url`.
    ///
    /// Logging out through the coordinator also clears the evaluator's
    /// permission snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be loaded or the base URL is invalid.
    pub async fn connect(
        registry: &TransportRegistry,
        config: &CliConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Report<CliError>> {
        let transport = registry
            .client(&config.namespace, &config.api_base_url)
            .await
            .map_err(|e| CliError::Session {
                details: e.to_string(),
            })?;

        let evaluator = Arc::new(AuthorizationEvaluator::new(
            config.namespace.clone(),
            Arc::new(RemotePermissionSource::with_path(
                Arc::clone(&transport),
                config.permissions_path.clone(),
            )),
            config.full_access.clone(),
        ));
        let coordinator = SessionCoordinator::new(Arc::clone(&transport), config.onboarding.clone())
            .with_logout_hook(Arc::clone(&evaluator) as Arc<dyn LogoutHook>);
        let social = SocialAuth::new(Arc::clone(&transport), navigator, config.app_origin.clone());
        let passwords = PasswordManagement::new(transport);

        Ok(Self {
            coordinator,
            evaluator,
            social,
            passwords,
        })
    }
}

/// Creates a transport registry persisting state to `config.storage_path`.
#[must_use]
pub fn file_registry(config: &CliConfig) -> TransportRegistry {
    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
    TransportRegistry::new(StoreRegistry::new(storage))
}

/// Prints redirect forms for the user to open, since a terminal cannot navigate.
#[derive(Debug, Default)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn submit(&self, form: RedirectForm) {
        info!(action = %form.action, "provider redirect ready");
        println!("{}", render_form(&form));
    }
}

/// Renders `form` as a self-submitting HTML document.
#[must_use]
pub fn render_form(form: &RedirectForm) -> String {
    let mut html = format!(
        "<form method=\"{}\" action=\"{}\">\n",
        form.method,
        escape(&form.action)
    );
    for (name, value) in &form.fields {
        html.push_str(&format!(
            "  <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
            escape(name),
            escape(value)
        ));
    }
    html.push_str("</form>\n<script>document.forms[0].submit()</script>");
    html
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_are_escaped() {
        let form = RedirectForm {
            action: "https://api.example.com/v1/auth/provider/redirect".to_string(),
            method: "POST",
            fields: vec![
                ("provider".to_string(), "github".to_string()),
                ("callback_url".to_string(), "https://app/cb?a=1&b=\"2\"".to_string()),
            ],
        };
        let html = render_form(&form);
        assert!(html.starts_with(
            "<form method=\"POST\" action=\"https://api.example.com/v1/auth/provider/redirect\">"
        ));
        assert!(html.contains("name=\"provider\" value=\"github\""));
        assert!(html.contains("value=\"https://app/cb?a=1&amp;b=&quot;2&quot;\""));
    }
}
