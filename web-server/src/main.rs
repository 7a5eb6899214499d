//! Binary entry point, mirroring the teacher's `bin/agentic_server.rs`:
//! load `.env`, init tracing, build a connection pool, wire the router,
//! bind a socket.

mod api;
mod error;
mod state;

use std::sync::Arc;

use axum::Router;
use buildtask_core::{BuildService, LocationService, PgStore, StoreConfig, SystemClock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StoreConfig::from_env()?;
    let store = PgStore::connect(config).await?;
    let repo: Arc<dyn buildtask_core::BuildRepository> = Arc::new(store);

    // The real world-effect port lives in the out-of-process tool layer that
    // forwards onto the world's tick executor; this binary only owns the
    // orchestration core, so it wires the no-op port by default.
    let port = buildtask_core::world::NoopWorldEffectPort;
    let service = Arc::new(BuildService::new(repo.clone(), Arc::new(port), Arc::new(SystemClock)));
    let location = Arc::new(LocationService::new(repo));

    let state = AppState { service, location };

    let app = Router::new()
        .merge(api::create_build_router(state.clone()))
        .merge(api::create_location_router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "buildtask server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
