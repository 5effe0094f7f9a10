//! Domain logic for client-side operations.
//!
//! Pure functions deciding how the client reacts to session errors.

use irori_shared::protocol::ROOM_FULL_MESSAGE;

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// A rejected join will be rejected again on every retry, so it is not worth reconnecting.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::RoomFull(_) | ClientError::JoinRejected(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }
    current_attempt < max_attempts
}

/// Map a `joinRoomResult` rejection message to a client error
pub fn join_rejection(room: Option<&str>, message: Option<String>) -> ClientError {
    match message {
        Some(message) if message == ROOM_FULL_MESSAGE => {
            ClientError::RoomFull(room.unwrap_or("(guest)").to_string())
        }
        Some(message) => ClientError::JoinRejected(message),
        None => ClientError::JoinRejected("no reason given".to_string()),
    }
}
