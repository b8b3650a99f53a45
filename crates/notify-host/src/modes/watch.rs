use std::time::Duration;

use notify_core::Account;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use super::batch::{BatchReport, BatchRunner};
use crate::reconciler::ReconcileMode;

/// Repeats a batch on a fixed interval in one process, so each account's
/// snapshot carries over from one round to the next.
pub struct Watcher {
    runner: BatchRunner,
    accounts: Vec<Account>,
    mode: ReconcileMode,
    interval: Duration,
    max_rounds: Option<usize>,
}

impl Watcher {
    pub fn new(
        runner: BatchRunner,
        accounts: Vec<Account>,
        mode: ReconcileMode,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            accounts,
            mode,
            interval,
            max_rounds: None,
        }
    }

    /// Stops after `rounds` batches instead of waiting for shutdown.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Runs until shutdown (or the round limit), handing each batch report
    /// to `on_report`. Returns the number of rounds run.
    pub async fn run(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
        mut on_report: impl FnMut(&BatchReport),
    ) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rounds = 0;
        loop {
            if self.max_rounds.is_some_and(|max| rounds >= max) {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.runner.run(&self.accounts, self.mode).await;
                    rounds += 1;
                    on_report(&report);
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }
        rounds
    }
}
