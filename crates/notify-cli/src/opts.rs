//! Global CLI options shared by every command.

use std::path::PathBuf;

use clap::Args;

/// Options that apply to all commands; most can be set via env vars.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Extra .env file loaded before anything else (env: NOTIFY_ENV_FILE)
    #[arg(long, global = true, env = "NOTIFY_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Patient portal base URL (env: NOTIFY_PORTAL_URL)
    #[arg(long, global = true, env = "NOTIFY_PORTAL_URL")]
    pub portal_url: Option<String>,

    /// Push relay endpoint (env: NOTIFY_PUSH_URL)
    #[arg(long, global = true, env = "NOTIFY_PUSH_URL")]
    pub push_url: Option<String>,

    /// Accounts reconciled at once (env: NOTIFY_MAX_CONCURRENCY)
    #[arg(long, global = true, env = "NOTIFY_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Log pushes instead of sending them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Suppress notices on stderr
    #[arg(long, global = true)]
    pub quiet: bool,
}
