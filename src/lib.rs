pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        return cli::cmd_init();
    }

    let config = Config::load()?;
    config.validate()?;

    let serving = matches!(cli.command, None | Some(Commands::Serve));

    let prometheus_handle = if serving && config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config, serving);
    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    match cli.command {
        None | Some(Commands::Serve) => run_server(config, prometheus_handle).await,
        Some(Commands::Links { session, page }) => cli::cmd_links(config, &session, page).await,
        Some(Commands::Info { id }) => cli::cmd_anime_info(config, &id).await,
        Some(Commands::Episode {
            session,
            episode_session,
            number,
        }) => cli::cmd_episode(config, &session, &episode_session, number).await,
        Some(Commands::Resolve { url }) => cli::cmd_resolve(&config, &url).await,
        Some(Commands::Init) => cli::cmd_init(),
    }
}

fn init_tracing(config: &Config, serving: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // One-shot commands keep stdout for JSON; logs go to stderr.
    let default_level = if serving {
        config.general.log_level.clone()
    } else {
        "warn".to_string()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "pahe-relay v{} starting (resolver: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.resolver.mode
    );

    if config.mal.client_id.is_none() {
        tracing::warn!("MAL_CLIENT_ID is not set; metadata lookups will fail");
    }

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config).await?);
    match shared.store.purge_expired_responses().await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "Dropped expired cached responses"),
        Err(e) => tracing::warn!("Failed to purge response cache: {e}"),
    }
    let api_state = api::create_app_state(shared, prometheus_handle);

    let app = api::router(api_state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
