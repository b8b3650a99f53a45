mod commands;
mod opts;
mod output;
mod util;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::check::CheckArgs;
use commands::push::PushArgs;
use commands::serve::ServeArgs;
use commands::watch::WatchArgs;
use opts::GlobalOpts;

#[derive(Parser, Debug)]
#[command(
    name = "notifyd",
    version,
    about = "Patient portal notification worker and notification store"
)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Notification store service
    #[command(subcommand)]
    Store(StoreCommand),

    /// Portal reconciliation worker service
    #[command(subcommand)]
    Worker(WorkerCommand),

    /// Run one reconciliation batch and print the report
    Check(CheckArgs),

    /// Run reconciliation batches on a fixed interval
    Watch(WatchArgs),

    /// Send a single push notification
    Push(PushArgs),
}

#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Serve the store HTTP API
    Serve(ServeArgs),
}

#[derive(Subcommand, Debug)]
enum WorkerCommand {
    /// Serve the worker HTTP API
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::load_env(cli.opts.env_file.as_deref())?;
    util::setup_logging();
    let opts = &cli.opts;

    match cli.command {
        Command::Store(cmd) => match cmd {
            StoreCommand::Serve(args) => commands::serve::cmd_store_serve(opts, &args).await,
        },
        Command::Worker(cmd) => match cmd {
            WorkerCommand::Serve(args) => commands::serve::cmd_worker_serve(opts, &args).await,
        },
        Command::Check(args) => commands::check::cmd_check(opts, &args).await,
        Command::Watch(args) => commands::watch::cmd_watch(opts, &args).await,
        Command::Push(args) => commands::push::cmd_push(opts, &args).await,
    }
}
