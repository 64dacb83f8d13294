use axum::{routing::get, Router};
use axum_db_gateway::{GatewayLayer, MemoryUserStore};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;

use config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "gateway-server", about = "JSON administration gateway for MySQL databases")]
struct Arguments {
    /// Path to a TOML configuration file (defaults to ./gateway.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum ServerError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let arguments = Arguments::parse();
    let configuration = ServerConfig::load(arguments.config.as_deref())?;

    let gateway = GatewayLayer::mysql(configuration.server.base_path.clone())
        .with_identity(MemoryUserStore::new())
        .into_router();

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .merge(gateway);

    if let Some(static_files) = &configuration.static_files {
        let index = static_files.directory.join("index.html");
        info!(directory = %static_files.directory.display(), "serving static files");
        app = app.fallback_service(
            ServeDir::new(&static_files.directory).fallback(ServeFile::new(index)),
        );
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_address = configuration.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Gateway running at http://{}", bind_address);
    info!(
        "Database endpoints at http://{}{}/api/database",
        bind_address, configuration.server.base_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "Server is healthy"
}
