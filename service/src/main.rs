mod config;
mod descriptor;
mod error;
mod handlers;
mod invoker;
mod orchestrator;
mod scan;
mod state;
mod uploads;

#[cfg(test)]
mod testutil;

use crate::config::ServiceConfig;
use crate::state::AppState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("service=debug,tower_http=info")),
        )
        .init();

    let config = ServiceConfig::from_env();

    // modelos y datasets que ya estaban en el volumen
    let session = scan::scan_storage(&config);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, session);

    // router HTTP
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("servicio escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
