use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use addressbridge_server::{config, node, routes};

const DEFAULT_PORT: u16 = 20000;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("AddressBridge server starting...");

    let config_path = config::config_path();
    let configuration = config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let node_client = node::NodeClient::new(
        &configuration.rpc_url,
        &configuration.rpc_user,
        &configuration.rpc_password,
    )
    .context("Failed to initialize node client")?;

    // Serving a half-synced node would hand out silently incomplete
    // histories, so block here until the tip is reached.
    node_client.wait_for_sync().await;

    let watch = configuration.watch_addresses();
    if watch.is_empty() {
        warn!("No watch addresses configured");
    } else {
        node_client.import_addresses(&watch).await;
    }

    let source: Arc<dyn node::TransactionSource> = Arc::new(node_client);
    let app = routes::router(source);

    let port = configuration.port.unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await.context("Failed to bind")?;
    axum::serve(listener, app).await?;

    Ok(())
}
