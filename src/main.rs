//! filedrop-server
//!
//! Main entry point for the file drop server.

use clap::Parser;
use filedrop_server::{
    formats::{self, ACCEPTED_FORMATS},
    state::{AppConfig, AppState},
    web_api,
};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line overrides for the environment config
#[derive(Debug, Parser)]
#[command(name = "filedrop-server", version, about)]
struct Cli {
    /// Port to run the server on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Directory served for non-API requests
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting filedrop-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Cli::parse().apply(AppConfig::default());
    tracing::info!(
        host = %config.host,
        port = config.port,
        static_dir = %config.static_dir.display(),
        ws_client_buffer = config.ws_client_buffer,
        "Configuration loaded"
    );
    tracing::info!(formats = %ACCEPTED_FORMATS.join(", "), "Accepted formats");
    tracing::info!(max_file_size = %formats::format_size(config.max_file_size), "Max file size");

    let state = AppState::new(config);

    let serve_dir = ServeDir::new(&state.config.static_dir);

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
