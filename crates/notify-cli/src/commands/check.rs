//! `notifyd check`: one reconciliation batch.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use notify_host::reconciler::ReconcileMode;

use super::{failure_notices, report_json};
use crate::opts::GlobalOpts;
use crate::output::print_success;
use crate::util;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// JSON array of accounts: [{id, name, username, password, pushToken?}]
    #[arg(long, env = "NOTIFY_ACCOUNTS")]
    pub accounts: PathBuf,

    /// Forward new items to the push relay
    #[arg(long)]
    pub notify: bool,
}

pub async fn cmd_check(opts: &GlobalOpts, args: &CheckArgs) -> Result<()> {
    let accounts = util::load_accounts(&args.accounts)?;
    let mode = if args.notify {
        ReconcileMode::CheckAndNotify
    } else {
        ReconcileMode::CheckOnly
    };
    let report = util::batch_runner(opts)?.run(&accounts, mode).await;
    let mut warnings = failure_notices(&report);
    if !accounts.is_empty() {
        // A one-shot run always starts without a baseline.
        warnings.push(
            "first pass per account records a baseline and reports nothing as new".into(),
        );
    }
    print_success(opts, report_json(&report), warnings)
}
