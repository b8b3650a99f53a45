pub mod error;
pub mod openapi;
pub mod store_api;
pub mod worker_api;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::HttpServerConfig;
use crate::error::HostError;

/// Binds `config.bind` and serves `app` until `shutdown_tx` fires. Returns
/// the bound address (useful with port 0) and the server task.
pub async fn spawn_http_server(
    config: HttpServerConfig,
    app: Router,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(SocketAddr, JoinHandle<()>), HostError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| HostError::Http(format!("bind {}: {e}", config.bind)))?;
    let addr = listener.local_addr()?;
    tracing::info!("HTTP server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(err) = serve(listener, app, shutdown_tx).await {
            tracing::error!("http server error: {err}");
        }
    });
    Ok((addr, handle))
}

async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), HostError> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(|e| HostError::Http(format!("serve: {e}")))
}
