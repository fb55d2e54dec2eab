//! Error taxonomy for snapshot reads and user actions

use thiserror::Error;

use crate::state::ControlKey;

/// Failure of a single read (or post) against the remote controller.
///
/// None of these are fatal: the poll loop logs them and keeps going, the
/// gateway turns them into a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response (connect, timeout, body read)
    #[error("transport error: {0}")]
    Transport(String),
    /// The controller answered with a non-success status and no usable body
    #[error("controller answered HTTP {status}")]
    Status { status: u16 },
    /// The payload did not have the expected shape
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Failure of an optimistic action issued through the gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Rejected locally before any network call
    #[error("{0}")]
    Validation(String),
    /// The same control already has a request in flight
    #[error("a request for {0} is already in progress")]
    Pending(ControlKey),
    /// The controller answered `{success: false}`
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] FetchError),
}

impl ActionError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
