use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify_core::Account;
use notify_host::adapters::portal_http::HttpPortal;
use notify_host::adapters::push::{ExpoPushRelay, LoggingRelay, PushRelay};
use notify_host::config::{PortalConfig, PushConfig, ReconcilerConfig};
use notify_host::modes::batch::BatchRunner;
use notify_host::reconciler::Reconciler;
use notify_host::snapshot::MemSnapshotStore;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::opts::GlobalOpts;

/// Loads `./.env` when present, then `extra`. Variables already set in the
/// environment win.
pub fn load_env(extra: Option<&Path>) -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(err) if err.not_found() => {}
        Err(err) => return Err(err).context("load .env"),
    }
    if let Some(path) = extra {
        for item in dotenvy::from_path_iter(path)
            .with_context(|| format!("load env file {}", path.display()))?
        {
            let (key, val) = item?;
            if std::env::var_os(&key).is_none() {
                unsafe {
                    std::env::set_var(&key, &val);
                }
            }
        }
    }
    Ok(())
}

/// Installs the log subscriber; `RUST_LOG` overrides the `info` default.
/// Logs go to stderr so stdout stays machine readable.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}

/// Sends on the returned channel at Ctrl-C or SIGTERM.
pub fn shutdown_on_signal() -> broadcast::Sender<()> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut term =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down...");
            }
            _ = async {
                if let Some(ref mut t) = term { t.recv().await; }
            } => {
                tracing::info!("SIGTERM received, shutting down...");
            }
        }
        let _ = tx.send(());
    });
    shutdown_tx
}

pub fn portal_config(opts: &GlobalOpts) -> Result<PortalConfig> {
    let mut config = PortalConfig::from_env()?;
    if let Some(url) = &opts.portal_url {
        config.base_url = url.clone();
    }
    Ok(config)
}

pub fn push_relay(opts: &GlobalOpts) -> Result<Arc<dyn PushRelay>> {
    if opts.dry_run {
        return Ok(Arc::new(LoggingRelay));
    }
    let mut config = PushConfig::from_env();
    if let Some(url) = &opts.push_url {
        config.endpoint = url.clone();
    }
    Ok(Arc::new(ExpoPushRelay::new(config)?))
}

/// Batch runner over the HTTP portal with a fresh in-memory snapshot store.
pub fn batch_runner(opts: &GlobalOpts) -> Result<BatchRunner> {
    let portal = portal_config(opts)?;
    let mut config = ReconcilerConfig::from_env(&portal)?;
    if let Some(n) = opts.max_concurrency {
        config.max_concurrency = n;
    }
    let reconciler = Reconciler::new(
        Arc::new(HttpPortal::new(portal)),
        push_relay(opts)?,
        Arc::new(MemSnapshotStore::new()),
        config,
    );
    Ok(BatchRunner::new(Arc::new(reconciler)))
}

/// Reads a JSON array of accounts (`{id, name, username, password, pushToken?}`).
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read accounts file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse accounts file {}", path.display()))
}
