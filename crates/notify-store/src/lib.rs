//! In-memory state of the notification store service.
//!
//! Notifications form an append-only log keyed by recipient; devices and
//! preference records sit next to it. Everything lives behind one lock and is
//! lost on restart. HTTP exposure lives in `notify-host`.

mod gating;
mod mem_store;
pub mod query;
pub mod records;

pub use gating::{DeliveryDecision, SkipReason};
pub use mem_store::{Broadcast, NotificationStore};
pub use query::{ListPage, ListQuery, SyncPage};
pub use records::{
    BroadcastRequest, BulkSendRequest, Device, DeviceRegistration, LocalizedText, Notification,
    NotificationContent, Preferences, PreferencesPatch, SendRequest,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    InvalidData(String),
    #[error("{0}")]
    NotFound(String),
}

impl StoreError {
    /// Stable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidData(_) => "INVALID_DATA",
            StoreError::NotFound(_) => "NOT_FOUND",
        }
    }
}
