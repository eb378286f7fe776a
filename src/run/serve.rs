//! Gateway entry point.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::gateway::{start_gateway, GatewayState};
use crate::initialization::open_sqlite_store;

/// Serves lookups from the database in `config` until `cancel` fires.
pub async fn run_gateway(config: GatewayConfig, cancel: CancellationToken) -> Result<()> {
    let store = open_sqlite_store(&config.db_path).await?;
    let state = GatewayState {
        search: Arc::new(store),
    };
    start_gateway(&config.http_addr, state, cancel).await
}
