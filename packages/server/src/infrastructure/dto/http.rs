//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDto {
    pub ok: bool,
    pub model: String,
}

/// Element of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    /// Usernames in join order
    pub members: Vec<String>,
    pub queue_length: usize,
    pub busy: bool,
    pub created_at: String,
}

/// `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub capacity: usize,
    pub members: Vec<MemberDetailDto>,
    pub queue: Vec<QueueEntryDto>,
    pub busy: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub id: String,
    pub username: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryDto {
    pub position: usize,
    pub username: String,
    pub enqueued_at: String,
}
