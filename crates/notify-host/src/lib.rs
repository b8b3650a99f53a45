//! Runtime side of portal notification reconciliation: portal and push
//! adapters, the per-account reconciler, batch and watch modes, and the two
//! HTTP services (worker and notification store).

pub mod adapters;
pub mod config;
pub mod error;
pub mod http;
pub mod modes;
pub mod reconciler;
pub mod snapshot;

pub use adapters::portal::{AckTarget, Portal, PortalError, PortalSession};
pub use adapters::portal_http::HttpPortal;
pub use adapters::push::{ExpoPushRelay, LoggingRelay, PushRelay};
pub use config::{HttpServerConfig, PortalConfig, PushConfig, ReconcilerConfig};
pub use error::HostError;
pub use modes::batch::{BatchReport, BatchRunner};
pub use modes::watch::Watcher;
pub use reconciler::{
    AccountReport, ErrorKind, Outcome, PassState, PassSummary, ReconcileError, ReconcileMode,
    Reconciler, Trail,
};
pub use snapshot::{MemSnapshotStore, SnapshotStore};
