use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fragserve::convert::Orchestrator;
use fragserve::engine::{EngineConfig, SidecarEngine};
use fragserve::web::{self, AppState};
use fragstore::{FragmentStore, StoreConfig};

/// The fragserve conversion cache server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Directory for stored fragment/properties pairs
    /// (overrides FRAGSERVE_STORE_PATH)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Public URL prefix stored files are served under
    #[arg(long)]
    public_base: Option<String>,

    /// Base URL of the geometry conversion sidecar
    #[arg(long, default_value = "http://127.0.0.1:7700")]
    engine_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut store_config = StoreConfig::from_env().context("Failed to load store configuration")?;
    if let Some(dir) = cli.store_dir {
        store_config.base_path = dir;
    }
    if let Some(base) = cli.public_base {
        store_config.public_base = base;
    }

    tracing::info!("📦 Initializing fragment store...");
    let store = Arc::new(
        FragmentStore::new(store_config.clone()).context("Failed to initialize fragment store")?,
    );
    tracing::info!("   Store ready at: {}", store_config.base_path.display());

    let engine = Arc::new(SidecarEngine::new(&cli.engine_url, EngineConfig::default()));
    tracing::info!("   Conversion engine: {}", cli.engine_url);

    let orchestrator = Arc::new(Orchestrator::new(store.clone(), engine));
    let state = AppState {
        store,
        orchestrator,
    };

    let app = web::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("🏗️  fragserve ready!");
    tracing::info!("   Check:   GET  http://{}/api/fragments/{{name}}", addr);
    tracing::info!("   Upload:  POST http://{}/api/fragments/{{name}}", addr);
    tracing::info!("   Convert: POST http://{}/api/convert-ifc", addr);
    tracing::info!("   Files:   GET  http://{}/files/{{key}}.frag", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
