//! Secure Dashboard - Entra ID sign-in with a role-gated dashboard
//!
//! A terminal client that signs in against Microsoft Entra ID, shows the
//! signed-in identity with role-gated sections, and calls a protected API.

mod api;
mod auth;
mod config;
mod models;
mod tui;
mod views;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::ProtectedApi;
use crate::auth::EntraTokenProvider;
use crate::config::Config;

/// Log file written in TUI mode, inside the config directory.
const TUI_LOG_FILE: &str = "secure-dashboard.log";

#[derive(Parser)]
#[command(name = "secure-dashboard")]
#[command(about = "Entra ID secured dashboard for the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Microsoft Entra ID
    Login {
        /// Force interactive sign-in even if a cached session exists
        #[arg(short, long)]
        force: bool,
    },

    /// Sign out and clear cached credentials
    Logout,

    /// Show token cache status
    Status,

    /// Show the signed-in identity and roles
    Whoami,

    /// Print the role-gated dashboard
    Dashboard,

    /// Call the protected API with a silently acquired access token
    CallApi {
        /// Endpoint to call instead of the configured `api_url`
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Launch the terminal user interface
    Tui,
}

/// Log to stderr, or to a file in TUI mode so output does not corrupt the
/// alternate screen.
fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if to_file {
        let dir = Config::config_dir()?;
        std::fs::create_dir_all(&dir).context("Failed to create config directory")?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(TUI_LOG_FILE))
            .context("Failed to open log file")?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, matches!(cli.command, Commands::Tui))?;

    let config = Config::load()?;
    let api_url = config.settings.api_url.clone();
    let api_scopes = config.settings.api_scopes.clone();
    let provider = Arc::new(EntraTokenProvider::from_config(config)?);
    let login_scopes = provider.auth_config().login_scopes.clone();

    match cli.command {
        Commands::Login { force } => {
            tracing::info!("Starting authentication flow...");
            auth::login(provider.as_ref(), &login_scopes, force).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout(&provider).await?;
        }
        Commands::Status => {
            auth::status(&provider);
        }
        Commands::Whoami => {
            api::whoami(provider.as_ref())?;
        }
        Commands::Dashboard => {
            api::dashboard(provider.as_ref());
        }
        Commands::CallApi { endpoint } => {
            let api = ProtectedApi::new(endpoint.unwrap_or(api_url), api_scopes);
            api::call_api(provider.as_ref(), &api).await?;
        }
        Commands::Tui => {
            tui::run(tui::BackendContext {
                provider,
                api: ProtectedApi::new(api_url, api_scopes),
                login_scopes,
            })
            .await?;
        }
    }

    Ok(())
}
