//! Error types for the terminal client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The room already has the maximum number of members
    #[error("Room '{0}' is full")]
    RoomFull(String),

    /// The server rejected the join for another reason (invalid username, ...)
    #[error("Join rejected: {0}")]
    JoinRejected(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
