//! Conversion logic between domain entities and DTOs.

use irori_shared::{protocol::MemberInfo, time::millis_to_rfc3339};

use crate::domain::{Member, Room};

use super::http::{MemberDetailDto, QueueEntryDto, RoomDetailDto, RoomSummaryDto};

pub fn member_info(member: &Member) -> MemberInfo {
    MemberInfo {
        id: member.id.as_str().to_string(),
        username: member.username.as_str().to_string(),
    }
}

/// Member list in join order, as sent with `updateMembers`
pub fn member_infos(room: &Room) -> Vec<MemberInfo> {
    room.members.iter().map(member_info).collect()
}

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .members
                .iter()
                .map(|m| m.username.as_str().to_string())
                .collect(),
            queue_length: room.queue.len(),
            busy: room.busy,
            created_at: millis_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            capacity: room.capacity(),
            members: room
                .members
                .iter()
                .map(|m| MemberDetailDto {
                    id: m.id.as_str().to_string(),
                    username: m.username.as_str().to_string(),
                    joined_at: millis_to_rfc3339(m.joined_at.value()),
                })
                .collect(),
            queue: room
                .queue
                .iter()
                .enumerate()
                .map(|(index, entry)| QueueEntryDto {
                    position: index + 1,
                    username: entry.username.as_str().to_string(),
                    enqueued_at: millis_to_rfc3339(entry.enqueued_at.value()),
                })
                .collect(),
            busy: room.busy,
            created_at: millis_to_rfc3339(room.created_at.value()),
        }
    }
}
