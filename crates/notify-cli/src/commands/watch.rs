//! `notifyd watch`: repeated batches in one process.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use notify_host::modes::watch::Watcher;
use notify_host::reconciler::ReconcileMode;

use super::{failure_notices, report_json};
use crate::opts::GlobalOpts;
use crate::output::print_success;
use crate::util;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// JSON array of accounts: [{id, name, username, password, pushToken?}]
    #[arg(long, env = "NOTIFY_ACCOUNTS")]
    pub accounts: PathBuf,

    /// Seconds between batch starts
    #[arg(long, default_value_t = 300, env = "NOTIFY_WATCH_INTERVAL_SECS")]
    pub interval_secs: u64,

    /// Only report new items, never push them
    #[arg(long)]
    pub check_only: bool,

    /// Stop after this many batches
    #[arg(long)]
    pub max_rounds: Option<usize>,
}

pub async fn cmd_watch(opts: &GlobalOpts, args: &WatchArgs) -> Result<()> {
    if args.interval_secs == 0 {
        bail!("--interval-secs must be greater than zero");
    }
    let accounts = util::load_accounts(&args.accounts)?;
    let mode = if args.check_only {
        ReconcileMode::CheckOnly
    } else {
        ReconcileMode::CheckAndNotify
    };
    let mut watcher = Watcher::new(
        util::batch_runner(opts)?,
        accounts,
        mode,
        Duration::from_secs(args.interval_secs),
    );
    if let Some(rounds) = args.max_rounds {
        watcher = watcher.with_max_rounds(rounds);
    }

    let shutdown_tx = util::shutdown_on_signal();
    let mut output_error = None;
    let rounds = watcher
        .run(shutdown_tx.subscribe(), |report| {
            if output_error.is_none() {
                output_error =
                    print_success(opts, report_json(report), failure_notices(report)).err();
            }
        })
        .await;
    if let Some(err) = output_error {
        return Err(err);
    }
    tracing::info!(rounds, "watch stopped");
    Ok(())
}
