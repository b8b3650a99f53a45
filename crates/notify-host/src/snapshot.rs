use std::collections::HashMap;
use std::sync::RwLock;

use notify_core::ObservedItem;

/// Last full observation per account, used as the diff baseline.
pub trait SnapshotStore: Send + Sync {
    /// `None` when the account has never completed a pass.
    fn load(&self, account_id: &str) -> Option<Vec<ObservedItem>>;

    /// Replaces the account's snapshot wholesale.
    fn replace(&self, account_id: &str, items: Vec<ObservedItem>);

    fn accounts(&self) -> Vec<String>;
}

/// Process-lifetime snapshot store. Restarting the process forgets every
/// baseline, so the next pass of each account is a cold start.
#[derive(Debug, Default)]
pub struct MemSnapshotStore {
    inner: RwLock<HashMap<String, Vec<ObservedItem>>>,
}

impl MemSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemSnapshotStore {
    fn load(&self, account_id: &str) -> Option<Vec<ObservedItem>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(account_id)
            .cloned()
    }

    fn replace(&self, account_id: &str, items: Vec<ObservedItem>) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(account_id.to_string(), items);
    }

    fn accounts(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
