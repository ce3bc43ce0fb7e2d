//! passgate - username/password authentication service
//!
//! This is the main entry point for the passgate application.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use passgate::auth::{AuthConfig, AuthManager};
use passgate::config::{AdminSeedConfig, Config};
use passgate::error::AuthError;
use passgate::database::SqliteStore;
use passgate::server::{AppState, Server};
use passgate::telemetry::init_tracing;

/// passgate - username/password authentication service
#[derive(Parser, Debug)]
#[command(name = "passgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "PASSGATE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing/logging
    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting passgate");

    // Initialize database
    let store = SqliteStore::new(&config.database.path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(store);
    info!(path = %config.database.path, "Database initialized");

    // Initialize authentication manager
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .context("auth.jwt_secret is not set")?;
    let auth_manager = Arc::new(AuthManager::new(
        Arc::clone(&store),
        AuthConfig::new(jwt_secret, config.auth.token_ttl()),
    ));
    info!(
        token_ttl_secs = config.auth.token_ttl_secs,
        "Authentication manager initialized"
    );

    seed_admin(&auth_manager, &config.auth.admin).await?;

    // Create and start the HTTP server
    let server = Server::new(config.server.clone(), AppState::new(auth_manager));

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    let result = server.run(shutdown_signal()).await;

    info!("passgate shutdown complete");

    result.map_err(Into::into)
}

/// Create the configured administrator if no admin exists yet
///
/// Seeding failures abort startup.
async fn seed_admin(
    auth_manager: &AuthManager<SqliteStore>,
    admin: &AdminSeedConfig,
) -> anyhow::Result<()> {
    if !admin.enabled {
        return Ok(());
    }

    let Some(password) = admin.password.as_deref() else {
        warn!("auth.admin.password is not set, skipping admin seeding");
        return Ok(());
    };

    match auth_manager
        .ensure_admin_exists(&admin.username, password)
        .await
    {
        Ok(true) => info!(username = %admin.username, "Seeded admin user"),
        Ok(false) => info!("Admin user already present"),
        Err(AuthError::DuplicateUsername) => {
            error!(username = %admin.username, "Admin username belongs to a non-admin account");
            anyhow::bail!(
                "Cannot seed admin: username '{}' is already taken by a non-admin account",
                admin.username
            );
        }
        Err(e) => {
            error!(error = %e, "Failed to seed admin user");
            anyhow::bail!("Failed to seed admin user: {}", e);
        }
    }

    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
