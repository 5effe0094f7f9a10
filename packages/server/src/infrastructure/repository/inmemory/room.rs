//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! `HashMap<RoomId, Room>` をインメモリ DB として使用します。
//!
//! 全ての操作は 1 つの Mutex の下で行われるため、各メソッドは原子的に実行されます。
//! ロックを保持したまま外部 API を呼び出すことはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use irori_shared::time::{Clock, SystemClock};
use tokio::sync::Mutex;

use crate::domain::{
    ChatLine, ConnectionId, DrainStart, Member, QueueEntry, RepositoryError, Room, RoomId,
    RoomRepository, Timestamp,
};

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    /// Room ID → Room
    rooms: Mutex<HashMap<RoomId, Room>>,
    /// Room 作成時刻の取得に使う時計
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRepository {
    /// 空の Registry を作成
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn join(&self, room_id: RoomId, member: Member) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let created_at = Timestamp::new(self.clock.now_millis());
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", room_id);
            Room::new(room_id, created_at)
        });
        room.add_member(member)?;
        Ok(room.clone())
    }

    async fn switch_room(
        &self,
        from: &RoomId,
        to: RoomId,
        member: Member,
    ) -> Result<(Option<Room>, Room), RepositoryError> {
        let mut rooms = self.rooms.lock().await;

        if from == &to {
            let room = rooms
                .get_mut(&to)
                .ok_or_else(|| RepositoryError::RoomNotFound(to.as_str().to_string()))?;
            room.upsert_member(member)?;
            return Ok((None, room.clone()));
        }

        // 移動先への追加が唯一の失敗しうる操作なので、先に行う
        let connection_id = member.id.clone();
        let created_at = Timestamp::new(self.clock.now_millis());
        let joined = rooms.entry(to.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", to);
            Room::new(to, created_at)
        });
        joined.add_member(member)?;
        let joined = joined.clone();

        let left = rooms.get_mut(from).map(|room| {
            room.remove_member(&connection_id);
            room.purge_entries_from(&connection_id);
            room.clone()
        });
        Ok((left, joined))
    }

    async fn remove_connection(&self, connection_id: &ConnectionId) -> Vec<Room> {
        let mut rooms = self.rooms.lock().await;
        let mut affected: Vec<Room> = rooms
            .values_mut()
            .filter_map(|room| {
                let removed_member = room.remove_member(connection_id);
                let purged = room.purge_entries_from(connection_id);
                if purged > 0 {
                    tracing::debug!(
                        "Purged {} pending AI request(s) of '{}' from room '{}'",
                        purged,
                        connection_id,
                        room.id
                    );
                }
                (removed_member || purged > 0).then(|| room.clone())
            })
            .collect();
        affected.sort_by(|a, b| a.id.cmp(&b.id));
        affected
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    async fn member_ids(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(|room| room.member_ids())
            .unwrap_or_default()
    }

    async fn enqueue(
        &self,
        room_id: &RoomId,
        entry: QueueEntry,
    ) -> Result<Vec<usize>, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        room.enqueue(entry);
        Ok(room.queue_positions())
    }

    async fn begin_drain(&self, room_id: &RoomId) -> Option<DrainStart> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id)?;
        let entry = room.begin_drain()?;
        Some(DrainStart {
            entry,
            remaining: room.queue_positions(),
        })
    }

    async fn finish_drain(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.lock().await;
        rooms
            .get_mut(room_id)
            .map(|room| room.finish_drain())
            .unwrap_or(false)
    }

    async fn record_line(&self, room_id: &RoomId, line: ChatLine) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        room.record_line(line);
        Ok(())
    }

    async fn recent_history(&self, room_id: &RoomId, limit: usize) -> Vec<ChatLine> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(|room| room.recent_history(limit))
            .unwrap_or_default()
    }
}
