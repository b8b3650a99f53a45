use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::Notification;
use crate::{StoreError, StoreResult};

pub const DEFAULT_LIMIT: usize = 50;

/// Query-string filters for a recipient's notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    /// Only the literal `true` filters to unread notifications.
    #[serde(default)]
    pub unread: Option<String>,
    /// Comma separated notification types.
    #[serde(default)]
    pub types: Option<String>,
    /// RFC 3339 instant; only strictly newer notifications are kept.
    #[serde(default)]
    pub since: Option<String>,
}

impl ListQuery {
    pub fn unread_only(&self) -> bool {
        self.unread.as_deref() == Some("true")
    }

    pub fn type_list(&self) -> Option<Vec<&str>> {
        self.types
            .as_deref()
            .map(|raw| raw.split(',').filter(|t| !t.is_empty()).collect())
    }

    pub fn since(&self) -> StoreResult<Option<DateTime<Utc>>> {
        self.since.as_deref().map(parse_instant).transpose()
    }
}

pub(crate) fn parse_instant(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid timestamp '{raw}': {e}")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    /// Matches after filtering, before paging.
    pub total: usize,
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPage {
    pub notifications: Vec<Notification>,
    /// Always empty: deletions are not tracked.
    pub deleted_ids: Vec<String>,
    pub sync_time: DateTime<Utc>,
}
