use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use notify_core::Account;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reconciler::{
    AccountReport, PassState, ReconcileError, ReconcileMode, Reconciler, Trail,
};

/// Result of one batch: exactly one report per submitted account, in
/// submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub mode: ReconcileMode,
    pub accounts: Vec<AccountReport>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.accounts.iter().filter(|r| r.is_success()).count()
    }

    /// Accounts that completed with at least one new item.
    pub fn with_new_items(&self) -> impl Iterator<Item = &AccountReport> {
        self.accounts
            .iter()
            .filter(|r| r.is_success() && r.new_count() > 0)
    }
}

#[derive(Clone)]
pub struct BatchRunner {
    reconciler: Arc<Reconciler>,
}

impl BatchRunner {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Runs every account with at most `max_concurrency` passes in flight.
    /// Passes still running at the batch deadline are dropped and reported
    /// as timed out; finished ones keep their result.
    pub async fn run(&self, accounts: &[Account], mode: ReconcileMode) -> BatchReport {
        let started = Instant::now();
        let config = self.reconciler.config();
        let deadline = tokio::time::Instant::now() + config.batch_timeout;
        let concurrency = config.max_concurrency.max(1);
        info!(accounts = accounts.len(), concurrency, ?mode, "batch started");

        let trails: Vec<Trail> = accounts
            .iter()
            .map(|a| Trail::new(&a.account_id))
            .collect();
        let mut slots: Vec<Option<AccountReport>> = vec![None; accounts.len()];

        {
            let passes = futures::stream::iter(
                accounts
                    .iter()
                    .cloned()
                    .zip(trails.iter().cloned())
                    .enumerate()
                    .map(|(idx, (account, trail))| {
                        let reconciler = self.reconciler.clone();
                        async move { (idx, reconciler.run_account(&account, mode, trail).await) }
                    }),
            )
            .buffer_unordered(concurrency);
            let mut passes = Box::pin(passes);

            let drain = async {
                while let Some((idx, report)) = passes.next().await {
                    slots[idx] = Some(report);
                }
            };
            if tokio::time::timeout_at(deadline, drain).await.is_err() {
                // Dropped passes never reach `PortalSession::close`.
                warn!("batch deadline reached, abandoning unfinished accounts");
            }
        }

        let reports: Vec<AccountReport> = slots
            .into_iter()
            .zip(accounts.iter().zip(trails.iter()))
            .map(|(slot, (account, trail))| {
                slot.unwrap_or_else(|| {
                    trail.enter(PassState::Failed);
                    AccountReport::failed(account, trail.states(), &ReconcileError::Abandoned)
                })
            })
            .collect();

        let report = BatchReport {
            mode,
            accounts: reports,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            total = report.accounts.len(),
            succeeded = report.success_count(),
            with_new = report.with_new_items().count(),
            elapsed_ms = report.elapsed_ms,
            "batch finished"
        );
        report
    }
}
