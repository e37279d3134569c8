use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pickframe_server::create_app;
use pickframe_server::infra::config::{ConfigLoad, ConfigLoader};
use pickframe_server::infra::startup::{Collaborators, build_state, spawn_background_tasks};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "pickframe-server")]
#[command(about = "Serves one previously unserved, resized photo per request")]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Alternative .env file to read before the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match cli.env_file.clone() {
        Some(path) => ConfigLoader::new().with_env_file(path),
        None => ConfigLoader::new(),
    };
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }

    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    info!(
        root = %config.library.root_folder.display(),
        target = %config.library.target_folder.display(),
        resize.width = config.transform.width,
        resize.height = config.transform.height,
        transform.workers = config.transform.workers,
        draw.retry_budget = config.draw.retry_budget,
        draw.timeout_ms = config.draw.response_timeout.as_millis() as u64,
        refill.watermark = config.refill.watermark,
        refill.ttl_secs = config.refill.pool_ttl.as_secs(),
        "configuration loaded"
    );

    let config = Arc::new(config);
    let collaborators = Collaborators::from_config(&config);
    let state = build_state(Arc::clone(&config), collaborators).await?;
    let _expiry_watch = spawn_background_tasks(&state);

    let router = create_app(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Starting pickframe server on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
