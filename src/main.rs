use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use voicewire::{create_router, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "voicewire", about = "Realtime voice/video streaming client")]
struct Args {
    /// Config file (without extension), loaded via the config crate
    #[arg(long, default_value = "config/voicewire")]
    config: String,

    /// Override the service endpoint from the config file
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        cfg.transport.endpoint = endpoint;
    }

    info!("Voicewire v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Service endpoint: {}", cfg.transport.endpoint);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(Arc::new(cfg));
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Control API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Wait for ctrl-c, then wind the session down so device and socket handles
/// are released before exit.
async fn shutdown_signal(state: AppState) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");

    let session = { state.session.write().await.take() };
    if let Some(session) = session {
        if let Err(e) = session.shutdown().await {
            error!("Failed to shut down session: {:#}", e);
        }
    }
}
