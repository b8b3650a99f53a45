use thiserror::Error;

use crate::adapters::portal::PortalError;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("portal error: {0}")]
    Portal(#[from] PortalError),
    #[error("push relay error: {0}")]
    Push(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("http server error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
