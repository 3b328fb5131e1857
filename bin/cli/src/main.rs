//! headless-auth command-line client.
//!
//! # Environment Variables
//!
//! - `HEADLESS_AUTH_API_BASE_URL`: API base URL (default `http://localhost:8000`)
//! - `HEADLESS_AUTH_NAMESPACE`: session namespace (default `default`)
//! - `HEADLESS_AUTH_APP_ORIGIN`: origin for provider callback URLs
//! - `HEADLESS_AUTH_STORAGE_PATH`: session state file
//! - `HEADLESS_AUTH_PERMISSIONS_PATH`: permissions endpoint path
//! - `HEADLESS_AUTH_ONBOARDING__ENABLED`: whether onboarding applies
//! - `HEADLESS_AUTH_FULL_ACCESS__MODE`: `always` or `role_gated`
//! - `HEADLESS_AUTH_FULL_ACCESS__ROLES`: comma-separated roles for `role_gated`
//! - `RUST_LOG`: log filter (default `info`)

use clap::{Parser, Subcommand};
use headless_auth_cli::config::CliConfig;
use headless_auth_cli::context::{AuthContext, PrintNavigator, file_registry};
use headless_auth_authz::AuthzError;
use headless_auth_cli::error::CliError;
use headless_auth_core::Namespace;
use headless_auth_session::{
    AuthData, ConfirmLoginCodeRequest, LoginCodeRequest, LoginRequest, ProviderProcess,
    TransportError,
};
use rootcause::prelude::Report;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Client for a headless authentication API
#[derive(Parser, Debug)]
#[command(name = "headless-auth")]
#[command(version, about, long_about = None)]
struct Args {
    /// Session namespace (also: HEADLESS_AUTH_NAMESPACE)
    #[arg(short, long)]
    namespace: Option<Namespace>,

    /// API base URL (also: HEADLESS_AUTH_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-read the authentication status from the server
    Status,
    /// Log in with a password
    Login {
        #[arg(long, conflicts_with = "username", required_unless_present = "username")]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Ask the server to send a login code
    RequestCode {
        #[arg(long)]
        email: String,
    },
    /// Log in with a code received by email
    ConfirmCode {
        #[arg(long)]
        code: String,
    },
    /// Fetch and print roles and permissions
    Permissions,
    /// Check `resource` or `resource.action` permissions
    Check {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print the form that starts a provider login
    Connect {
        provider: String,
        #[arg(long)]
        callback_url: Option<String>,
        /// Link the provider to the current user instead of logging in
        #[arg(long)]
        link: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Report<CliError>> {
    let config = CliConfig::from_env()
        .map_err(|e| CliError::Config {
            details: e.to_string(),
        })?
        .with_overrides(args.namespace, args.base_url);
    info!(namespace = %config.namespace, base_url = %config.api_base_url, "loaded configuration");

    let registry = file_registry(&config);
    let context = AuthContext::connect(&registry, &config, Arc::new(PrintNavigator)).await?;
    let session = |e: Report<TransportError>| CliError::Session {
        details: e.to_string(),
    };
    let authz = |e: Report<AuthzError>| CliError::Authz {
        details: e.to_string(),
    };

    match args.command {
        Command::Status => {
            let data = context
                .coordinator
                .sync_authentication_status()
                .await
                .map_err(session)?;
            print_auth(&context, &data);
        }
        Command::Login {
            email,
            username,
            password,
        } => {
            let request = match (email, username) {
                (Some(email), _) => LoginRequest::email(email, password),
                (None, Some(username)) => LoginRequest::username(username, password),
                (None, None) => {
                    return Err(CliError::InvalidArgument {
                        details: "either --email or --username is required".to_string(),
                    }
                    .into());
                }
            };
            let data = context.coordinator.login(&request).await.map_err(session)?;
            info!(authenticated = context.coordinator.is_authenticated(), "login finished");
            print_auth(&context, &data);
        }
        Command::Logout => {
            let flows = context.coordinator.logout().await.map_err(session)?;
            info!("logged out");
            for flow in flows {
                println!("available flow: {:?}", flow.id);
            }
        }
        Command::RequestCode { email } => {
            let data = context
                .coordinator
                .request_login_code(&LoginCodeRequest { email })
                .await
                .map_err(session)?;
            match data.pending_flow() {
                Some(flow) => println!("code sent, pending flow: {:?}", flow.id),
                None => println!("code requested"),
            }
        }
        Command::ConfirmCode { code } => {
            let data = context
                .coordinator
                .confirm_login_code(&ConfirmLoginCodeRequest { code })
                .await
                .map_err(session)?;
            print_auth(&context, &data);
        }
        Command::Permissions => {
            let snapshot = context.evaluator.refresh().await.map_err(authz)?;
            let rendered =
                serde_json::to_string_pretty(snapshot.as_ref()).map_err(|e| CliError::Authz {
                    details: e.to_string(),
                })?;
            println!("{rendered}");
        }
        Command::Check { keys } => {
            context.evaluator.refresh().await.map_err(authz)?;
            for key in &keys {
                let verdict = if context.evaluator.has_permission(key) {
                    "allowed"
                } else {
                    "denied"
                };
                println!("{key}: {verdict}");
            }
        }
        Command::Connect {
            provider,
            callback_url,
            link,
        } => {
            let process = if link {
                ProviderProcess::Connect
            } else {
                ProviderProcess::Login
            };
            context.social.connect(&provider, callback_url, Some(process));
        }
    }
    Ok(())
}

fn print_auth(context: &AuthContext, data: &AuthData) {
    println!("authenticated: {}", context.coordinator.is_authenticated());
    println!("onboarded: {}", context.coordinator.is_onboarded());
    println!(
        "session token: {}",
        if context.coordinator.token().is_some() {
            "present"
        } else {
            "none"
        }
    );
    if let Some(flow) = data.pending_flow() {
        println!("pending flow: {:?}", flow.id);
    }
}
