//! WebSocket event protocol.
//!
//! Every frame is a JSON text message with an adjacent tag:
//!
//! ```text
//! {"event": "joinRoom", "data": {"roomId": "r1", "username": "alice"}}
//! {"event": "aiTyping", "data": true}
//! ```

use serde::{Deserialize, Serialize};

/// Display name used for messages produced by the text generator
pub const AI_USERNAME: &str = "AI";

/// Rejection message for a join into a room at capacity
pub const ROOM_FULL_MESSAGE: &str = "Room full";

/// Events sent from a client to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join (or create) a room
    JoinRoom(JoinRoomRequest),
    /// Plain chat message for everyone in the room
    ChatMessage(MessageRequest),
    /// Message submitted to the room's AI queue
    AiMessage(MessageRequest),
}

/// Events sent from the server to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Reply to a `joinRoom` request (sent to the requester only)
    JoinRoomResult(JoinRoomResult),
    /// Chat line broadcast to the room
    ChatMessage(ChatBroadcast),
    /// Positions of the pending AI requests, `[1, 2, ...]`
    AiQueueUpdate(Vec<usize>),
    /// Whether the AI is currently generating an answer
    AiTyping(bool),
    /// Current member list of the room
    UpdateMembers(Vec<MemberInfo>),
    /// A frame from this client was rejected
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Room to join; a guest room is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    /// Target room; defaults to the room the connection joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JoinRoomResult {
    pub fn joined(room_id: String, members: Vec<MemberInfo>) -> Self {
        Self {
            success: true,
            room_id: Some(room_id),
            members: Some(members),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            room_id: None,
            members: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    pub username: String,
    pub message: String,
    /// Username of the member whose AI request this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Queue positions for a queue of `len` pending entries
pub fn queue_positions(len: usize) -> Vec<usize> {
    (1..=len).collect()
}
