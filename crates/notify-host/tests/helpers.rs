//! Shared builders for the integration tests.
//!
//! Each test binary compiles this module on its own, so some helpers look
//! unused depending on the file.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use notify_core::{Account, DocumentModel};
use notify_host::adapters::mock::{RecordingRelay, ScriptedPortal};
use notify_host::config::{PortalConfig, ReconcilerConfig};
use notify_host::modes::batch::BatchRunner;
use notify_host::reconciler::Reconciler;
use notify_host::snapshot::MemSnapshotStore;
use tokio::net::TcpListener;

pub const NOTIFICATIONS_URL: &str = "http://portal.test/Patient/Notification";

pub fn test_config() -> ReconcilerConfig {
    let portal = PortalConfig {
        base_url: "http://portal.test".into(),
        ..PortalConfig::default()
    };
    ReconcilerConfig {
        step_timeout: Duration::from_secs(5),
        batch_timeout: Duration::from_secs(10),
        ..ReconcilerConfig::for_portal(&portal)
    }
}

pub fn account(id: &str) -> Account {
    Account::new(id, format!("Patient {id}"), format!("user-{id}"), "pw")
        .with_push_token(format!("ExponentPushToken[{id}]"))
}

pub fn username(id: &str) -> String {
    format!("user-{id}")
}

/// Notification page with one dropdown entry per `(text, visit_id)`.
pub fn page(entries: &[(&str, &str)]) -> DocumentModel {
    entries
        .iter()
        .fold(DocumentModel::new(NOTIFICATIONS_URL), |doc, (text, visit)| {
            let href = format!("http://portal.test/Patient/Visit?VisitId={visit}");
            doc.with_entry(text, Some(&href))
        })
}

pub struct Harness {
    pub portal: ScriptedPortal,
    pub relay: RecordingRelay,
    pub snapshots: Arc<MemSnapshotStore>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(config: ReconcilerConfig) -> Self {
        let portal = ScriptedPortal::new();
        let relay = RecordingRelay::new();
        let snapshots = Arc::new(MemSnapshotStore::new());
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(portal.clone()),
            Arc::new(relay.clone()),
            snapshots.clone(),
            config,
        ));
        Self {
            portal,
            relay,
            snapshots,
            reconciler,
        }
    }

    pub fn runner(&self) -> BatchRunner {
        BatchRunner::new(self.reconciler.clone())
    }
}

pub async fn loopback_available() -> bool {
    TcpListener::bind("127.0.0.1:0").await.is_ok()
}
