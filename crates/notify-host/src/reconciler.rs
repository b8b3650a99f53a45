//! Per-account reconciliation pass.
//!
//! One pass walks a fixed sequence of states:
//! `INIT → AUTHENTICATING → FETCHING_NOTIFICATIONS → EXTRACTING → DIFFING →
//! (ACKNOWLEDGING →) FORWARDING → DONE`, or ends in `FAILED`. Only a failed
//! login or page fetch fails a pass; acknowledgement and delivery problems are
//! recorded in the report and the snapshot is still replaced.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use notify_core::{
    Account, DeliveryCandidate, DeliveryResult, Extractor, ObservedItem, VisitRef, diff,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::portal::{AckTarget, Portal, PortalError, PortalSession};
use crate::adapters::push::{PushRelay, token_preview};
use crate::config::ReconcilerConfig;
use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassState {
    Init,
    Authenticating,
    FetchingNotifications,
    Extracting,
    Diffing,
    Acknowledging,
    Forwarding,
    Done,
    Failed,
}

/// Failure category reported per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Fetch,
    /// Never produced by the current extractor.
    Extraction,
    Acknowledgment,
    Delivery,
    Timeout,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("authentication failed: {0}")]
    Auth(PortalError),
    #[error("fetching notifications failed: {0}")]
    Fetch(PortalError),
    #[error("batch deadline reached before the pass finished")]
    Abandoned,
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Auth(_) => ErrorKind::Auth,
            ReconcileError::Fetch(_) => ErrorKind::Fetch,
            ReconcileError::Abandoned => ErrorKind::Timeout,
        }
    }
}

/// Whether new items are handed to the push relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    CheckOnly,
    CheckAndNotify,
}

impl ReconcileMode {
    pub fn forwards(self) -> bool {
        matches!(self, ReconcileMode::CheckAndNotify)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckReport {
    pub target: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    /// Everything observed this pass; it is also the new snapshot.
    pub observed: Vec<ObservedItem>,
    pub new_items: Vec<DeliveryCandidate>,
    pub cold_start: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_visit: Option<VisitRef>,
    pub result_url: String,
    pub acknowledgements: Vec<AckReport>,
    pub deliveries: Vec<DeliveryResult>,
}

impl PassSummary {
    pub fn push_sent(&self) -> bool {
        self.deliveries.iter().any(|d| d.success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ReconcileError> for FailureReport {
    fn from(err: &ReconcileError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed(PassSummary),
    Failed(FailureReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub account_id: String,
    pub display_name: String,
    pub trail: Vec<PassState>,
    pub outcome: Outcome,
}

impl AccountReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed(_))
    }

    pub fn summary(&self) -> Option<&PassSummary> {
        match &self.outcome {
            Outcome::Completed(summary) => Some(summary),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            Outcome::Completed(_) => None,
        }
    }

    pub fn new_count(&self) -> usize {
        self.summary().map_or(0, |s| s.new_items.len())
    }

    pub(crate) fn failed(account: &Account, trail: Vec<PassState>, err: &ReconcileError) -> Self {
        Self {
            account_id: account.account_id.clone(),
            display_name: account.display_name.clone(),
            trail,
            outcome: Outcome::Failed(err.into()),
        }
    }
}

/// States visited by one pass. Shared so a pass dropped at the batch
/// deadline still reports how far it got.
#[derive(Debug, Clone)]
pub struct Trail {
    account_id: Arc<str>,
    states: Arc<Mutex<Vec<PassState>>>,
}

impl Trail {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.into(),
            states: Arc::new(Mutex::new(vec![PassState::Init])),
        }
    }

    pub fn enter(&self, state: PassState) {
        debug!(account = %self.account_id, ?state, "pass state");
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(state);
    }

    pub fn states(&self) -> Vec<PassState> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

pub struct Reconciler {
    portal: Arc<dyn Portal>,
    relay: Arc<dyn PushRelay>,
    snapshots: Arc<dyn SnapshotStore>,
    extractor: Extractor,
    config: ReconcilerConfig,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(
        portal: Arc<dyn Portal>,
        relay: Arc<dyn PushRelay>,
        snapshots: Arc<dyn SnapshotStore>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            portal,
            relay,
            snapshots,
            extractor: Extractor::new(config.extractor.clone()),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    fn account_lock(&self, account_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(account_id.to_string())
            .or_default()
            .clone()
    }

    /// Runs one pass for `account`. Passes for the same account id never
    /// overlap.
    pub async fn run_account(
        &self,
        account: &Account,
        mode: ReconcileMode,
        trail: Trail,
    ) -> AccountReport {
        let lock = self.account_lock(&account.account_id);
        let _guard = lock.lock().await;

        info!(account = %account.account_id, ?mode, "reconciliation pass started");
        match self.pass(account, mode, &trail).await {
            Ok(summary) => {
                trail.enter(PassState::Done);
                info!(
                    account = %account.account_id,
                    observed = summary.observed.len(),
                    new = summary.new_items.len(),
                    "reconciliation pass done"
                );
                AccountReport {
                    account_id: account.account_id.clone(),
                    display_name: account.display_name.clone(),
                    trail: trail.states(),
                    outcome: Outcome::Completed(summary),
                }
            }
            Err(err) => {
                trail.enter(PassState::Failed);
                warn!(account = %account.account_id, "reconciliation pass failed: {err}");
                AccountReport::failed(account, trail.states(), &err)
            }
        }
    }

    /// Bounds a portal call by the step timeout.
    async fn step<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, PortalError>>,
    ) -> Result<T, PortalError> {
        match tokio::time::timeout(self.config.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PortalError::Timeout {
                url: what.to_string(),
            }),
        }
    }

    async fn pass(
        &self,
        account: &Account,
        mode: ReconcileMode,
        trail: &Trail,
    ) -> Result<PassSummary, ReconcileError> {
        trail.enter(PassState::Authenticating);
        let session = self
            .step("login", self.portal.authenticate(&account.credentials))
            .await
            .map_err(ReconcileError::Auth)?;

        let result = self.with_session(account, mode, session.as_ref(), trail).await;
        session.close().await;
        // No await past this point: a pass dropped at the batch deadline
        // must leave the snapshot alone.
        if let Ok(summary) = &result {
            self.snapshots
                .replace(&account.account_id, summary.observed.clone());
        }
        result
    }

    async fn with_session(
        &self,
        account: &Account,
        mode: ReconcileMode,
        session: &dyn PortalSession,
        trail: &Trail,
    ) -> Result<PassSummary, ReconcileError> {
        trail.enter(PassState::FetchingNotifications);
        let url = &self.config.notifications_url;
        let page = self
            .step(url, session.fetch_page(url))
            .await
            .map_err(ReconcileError::Fetch)?;

        trail.enter(PassState::Extracting);
        let extraction = self.extractor.extract(&page);
        debug!(
            account = %account.account_id,
            items = extraction.items.len(),
            latest_visit = ?extraction.latest_visit.as_ref().map(|v| &v.visit_id),
            "extracted"
        );

        trail.enter(PassState::Diffing);
        let previous = self.snapshots.load(&account.account_id);
        let cold_start = previous.is_none();
        let fresh = diff(previous.as_deref(), &extraction.items);
        if cold_start {
            info!(account = %account.account_id, "no previous snapshot, nothing reported as new");
        }

        let acknowledgements = if extraction.is_empty() {
            Vec::new()
        } else {
            trail.enter(PassState::Acknowledging);
            let visit_ids = extraction.visit_ids();
            self.acknowledge(account, session, &visit_ids).await
        };

        let latest_visit = extraction.latest_visit.clone();
        let new_items: Vec<DeliveryCandidate> = fresh
            .into_iter()
            .map(|item| {
                DeliveryCandidate::promote(
                    item,
                    latest_visit.as_ref(),
                    &self.config.fallback_result_url,
                    account,
                    &self.config.templates,
                )
            })
            .collect();

        trail.enter(PassState::Forwarding);
        let deliveries = if mode.forwards() && !new_items.is_empty() {
            self.forward(account, &new_items).await
        } else {
            Vec::new()
        };

        let result_url = new_items
            .first()
            .map(|c| c.result_url.clone())
            .or_else(|| latest_visit.as_ref().map(|v| v.url.clone()))
            .unwrap_or_else(|| self.config.fallback_result_url.clone());

        Ok(PassSummary {
            observed: extraction.items,
            new_items,
            cold_start,
            latest_visit,
            result_url,
            acknowledgements,
            deliveries,
        })
    }

    /// Read-all first, then up to `ack_limit` visit pages side by side.
    /// Every attempt is independent and only logged on failure.
    async fn acknowledge(
        &self,
        account: &Account,
        session: &dyn PortalSession,
        visit_ids: &[&str],
    ) -> Vec<AckReport> {
        let mut reports = vec![self.ack_one(account, session, AckTarget::ReadAll).await];
        let visits = visit_ids
            .iter()
            .take(self.config.ack_limit)
            .map(|id| self.ack_one(account, session, AckTarget::Visit(id.to_string())));
        reports.extend(join_all(visits).await);
        reports
    }

    async fn ack_one(
        &self,
        account: &Account,
        session: &dyn PortalSession,
        target: AckTarget,
    ) -> AckReport {
        let label = target.to_string();
        match self.step(&label, session.acknowledge(&target)).await {
            Ok(()) => {
                debug!(account = %account.account_id, target = %label, "acknowledged");
                AckReport {
                    target: label,
                    ok: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!(account = %account.account_id, target = %label, "acknowledgement failed: {err}");
                AckReport {
                    target: label,
                    ok: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// One push per device token; each token's failure stays its own.
    async fn forward(
        &self,
        account: &Account,
        candidates: &[DeliveryCandidate],
    ) -> Vec<DeliveryResult> {
        let tokens = account.device_tokens();
        if tokens.is_empty() {
            info!(account = %account.account_id, "new items but no device token");
        }
        let mut results = Vec::with_capacity(tokens.len());
        for token in tokens {
            let message = self.config.templates.push_for(account, token, candidates);
            let result =
                match tokio::time::timeout(self.config.step_timeout, self.relay.deliver(message))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => DeliveryResult::failed(token, "push relay timed out"),
                };
            if result.success {
                info!(account = %account.account_id, token = %token_preview(token), "push delivered");
            } else {
                warn!(
                    account = %account.account_id,
                    token = %token_preview(token),
                    reason = result.reason.as_deref().unwrap_or_default(),
                    "push not delivered"
                );
            }
            results.push(result);
        }
        results
    }
}
