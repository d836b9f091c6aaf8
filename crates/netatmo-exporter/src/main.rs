//! Netatmo Exporter - Prometheus metrics for Netatmo weather stations.
//!
//! Run with: `cargo run -p netatmo-exporter`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use netatmo_core::{Collector, Credentials, NetatmoClient};
use netatmo_exporter::config::default_config_path;
use netatmo_exporter::{AppState, Config, api};

/// Netatmo Exporter - Prometheus metrics for Netatmo weather stations.
#[derive(Parser, Debug)]
#[command(name = "netatmo-exporter")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Minimum seconds between Netatmo API refreshes (overrides config).
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Seconds after which sensor readings are no longer exported (overrides config).
    #[arg(long)]
    stale_threshold: Option<u64>,

    /// Log level: trace, debug, info, warn or error (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Netatmo app client id.
    #[arg(long, env = "NETATMO_CLIENT_ID")]
    client_id: Option<String>,

    /// Netatmo app client secret.
    #[arg(long, env = "NETATMO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Netatmo refresh token.
    #[arg(long, env = "NETATMO_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

impl Args {
    /// Apply command-line and environment overrides on top of `config`.
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(secs) = self.refresh_interval {
            config.collector.refresh_interval = secs;
        }
        if let Some(secs) = self.stale_threshold {
            config.collector.stale_threshold = secs;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(id) = &self.client_id {
            config.netatmo.client_id = id.clone();
        }
        if let Some(secret) = &self.client_secret {
            config.netatmo.client_secret = secret.clone();
        }
        if let Some(token) = &self.refresh_token {
            config.netatmo.refresh_token = token.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    args.apply(&mut config);

    if args.init_config {
        let path = args.config.clone().unwrap_or_else(default_config_path);
        config.save(&path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    config.validate()?;
    init_logging(&config.logging.level)?;

    for warning in config.warnings() {
        warn!("{}", warning);
    }

    run_server(config).await
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = level.to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("netatmo_exporter={level}").parse()?)
                .add_directive(format!("netatmo_core={level}").parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let client = NetatmoClient::new(
        &config.netatmo.api_url,
        Credentials {
            client_id: config.netatmo.client_id.clone(),
            client_secret: config.netatmo.client_secret.clone(),
            refresh_token: config.netatmo.refresh_token.clone(),
        },
    )?;

    let settings = config.collector.settings();
    info!(
        "Refresh interval {}s, stale threshold {}s",
        settings.refresh_interval.as_secs(),
        settings.stale_threshold.as_secs()
    );
    let collector = Collector::new(Arc::new(client), settings);

    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(collector);

    let app = Router::new().merge(api::router()).with_state(state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}
