//! HTTP lookup gateway.
//!
//! Provides two endpoints:
//! - `/geo?ip=...` - JSON record for one IP address
//! - `/health` - liveness probe

mod handlers;
mod types;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use handlers::{geo_handler, health_handler};
pub use types::{ErrorResponse, GatewayState, GeoQuery};

/// Builds the gateway's router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/geo", get(geo_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serves the gateway on `addr` until `cancel` fires.
pub async fn start_gateway(
    addr: &str,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), anyhow::Error> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind gateway to {}: {}", addr, e))?;

    log::info!("Gateway listening on http://{}/", addr);
    log::info!("  - Lookup: http://{}/geo?ip=<address>", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("Gateway error: {}", e))?;

    Ok(())
}
