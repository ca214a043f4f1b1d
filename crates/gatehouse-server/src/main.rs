use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use gatehouse_server::config::load_config;
use gatehouse_server::{jobs, observability, seed, server};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From the --config CLI argument
    CliArgument,
    /// From the GATEHOUSE_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (gatehouse.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (GATEHOUSE_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present so local development can set environment
    // variables without exporting them.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path.display(),
        source = %source,
        issuer = %config.auth.issuer,
        "configuration loaded"
    );

    let components = match server::build_state(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Startup error: {e}");
            std::process::exit(1);
        }
    };

    match seed::seed_clients(components.clients.as_ref(), config.seed_clients.clone()).await {
        Ok(created) if created > 0 => tracing::info!(created, "seed clients registered"),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Seeding error: {e}");
            std::process::exit(1);
        }
    }

    let _rotation = jobs::spawn_key_rotation(
        components.key_ring.clone(),
        config.auth.signing.clone(),
    );
    let grants: Arc<dyn gatehouse_auth::storage::GrantStore> = components.grants.clone();
    let _cleanup = jobs::spawn_grant_cleanup(grants, config.grant_cleanup_interval);

    let router = server::build_router(components.state, &config);

    let listener = match tokio::net::TcpListener::bind(&config.listen).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {e}", config.listen);
            std::process::exit(1);
        }
    };

    tracing::info!(listen = %config.listen, "gatehouse server started");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Resolves the config path from CLI, environment, or the default.
fn resolve_config_path() -> (PathBuf, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (PathBuf::from(path), ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("GATEHOUSE_CONFIG") {
        return (PathBuf::from(path), ConfigSource::EnvironmentVariable);
    }

    (PathBuf::from("gatehouse.toml"), ConfigSource::Default)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
