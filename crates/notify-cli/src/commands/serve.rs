//! `notifyd store serve` and `notifyd worker serve`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use clap::Args;
use notify_host::config::HttpServerConfig;
use notify_host::http::spawn_http_server;
use notify_host::http::store_api::{self, StoreState};
use notify_host::http::worker_api::{self, WorkerState};
use notify_store::NotificationStore;

use crate::opts::GlobalOpts;
use crate::util;

const DEFAULT_PORT: u16 = 3000;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (default: 0.0.0.0:$PORT, PORT defaulting to 3000)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

impl ServeArgs {
    fn http_config(&self) -> Result<HttpServerConfig> {
        match self.bind {
            Some(bind) => Ok(HttpServerConfig::new(bind)),
            None => Ok(HttpServerConfig::from_env(DEFAULT_PORT)?),
        }
    }
}

pub async fn cmd_store_serve(opts: &GlobalOpts, args: &ServeArgs) -> Result<()> {
    let state = StoreState::new(NotificationStore::new(), util::push_relay(opts)?);
    serve(args, store_api::app(state), "notification store").await
}

pub async fn cmd_worker_serve(opts: &GlobalOpts, args: &ServeArgs) -> Result<()> {
    let state = WorkerState::new(util::batch_runner(opts)?, util::push_relay(opts)?);
    serve(args, worker_api::app(state), "notification worker").await
}

async fn serve(args: &ServeArgs, app: Router, name: &str) -> Result<()> {
    let shutdown_tx = util::shutdown_on_signal();
    let (addr, handle) = spawn_http_server(args.http_config()?, app, shutdown_tx)
        .await
        .with_context(|| format!("start {name}"))?;
    tracing::info!("{name} ready (OpenAPI: http://{addr}/api/openapi.json)");
    handle.await.context("http server task")?;
    tracing::info!("{name} stopped");
    Ok(())
}
