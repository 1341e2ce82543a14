//! Error types for bridges and their collaborators

use hamb_storage::StorageError;
use thiserror::Error;

/// Result type for bridge and bridge service operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge- and service-scoped failures
///
/// Entity-scoped failures never surface here; they are recorded as
/// failed devices on the bridge instead.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Port already in use: {port}")]
    PortConflict { port: u16 },

    #[error("registry refresh failed: {0}")]
    RegistryRefresh(#[source] RegistryError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to construct bridge: {0}")]
    Construction(String),

    #[error("bridge {0} is disposed")]
    Disposed(String),
}

/// Failure of the entity source behind a [`BridgeRegistry`](crate::BridgeRegistry)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity source unavailable: {0}")]
    Unavailable(String),
}

/// Classification of entity endpoint failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The entity cannot be represented as a device at all
    #[error("{0}")]
    InvalidDevice(String),

    #[error("{0}")]
    Failed(String),
}

/// Failure of the protocol server owning a bridge's port
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol server error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("subscription failed: {0}")]
    Failed(String),
}
