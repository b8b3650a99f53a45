use async_trait::async_trait;
use notify_core::{DocumentModel, PortalCredentials};
use thiserror::Error;

/// Portal-side action that marks items as seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckTarget {
    /// The portal's "read all notifications" page.
    ReadAll,
    /// Detail page of one visit; opening it stamps the item as seen.
    Visit(String),
}

impl std::fmt::Display for AckTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AckTarget::ReadAll => f.write_str("read-all"),
            AckTarget::Visit(id) => write!(f, "visit {id}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortalError {
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("network error: {0}")]
    Network(String),
}

impl PortalError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PortalError::Timeout { .. })
    }
}

/// Entry point to the external patient portal.
#[async_trait]
pub trait Portal: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &PortalCredentials,
    ) -> Result<Box<dyn PortalSession>, PortalError>;
}

/// An authenticated browsing session. Calls are independent of each other
/// and each may fail on its own.
#[async_trait]
pub trait PortalSession: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<DocumentModel, PortalError>;

    async fn acknowledge(&self, target: &AckTarget) -> Result<(), PortalError>;

    /// Ends the session. Not called for passes abandoned at the batch
    /// deadline; those sessions are only dropped, so cleanup that must
    /// always happen belongs in `Drop`.
    async fn close(&self) {}
}
