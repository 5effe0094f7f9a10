//! UseCase: Room 参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() / switch() メソッド
//! - Room の遅延作成、定員チェック、参加者リストのブロードキャスト
//! - 参加中の接続の Room 移動（移動先が満員なら移動元に留まる）
//!
//! ### どのような状況を想定しているか
//! - 正常系：4 人までの参加と updateMembers の通知
//! - 異常系：5 人目の参加（要求者にのみ通知し、ブロードキャストしない）、満員の Room への移動
//! - エッジケース：Room ID 省略時のゲスト Room 作成、不正なユーザー名

use std::sync::Arc;

use irori_shared::{
    protocol::ServerEvent,
    time::{Clock, SystemClock},
};

use crate::{
    domain::{
        ConnectionId, Member, RepositoryError, Room, RoomId, RoomIdFactory, RoomRepository,
        Timestamp, Username,
    },
    infrastructure::dto::conversion::member_infos,
};

use super::{broadcast::RoomBroadcaster, error::JoinRoomError};

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: RoomBroadcaster,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, broadcaster: RoomBroadcaster) -> Self {
        Self::with_clock(repository, broadcaster, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<dyn RoomRepository>,
        broadcaster: RoomBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            broadcaster,
            clock,
        }
    }

    /// Room 参加を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 参加する接続
    /// * `room_id` - 参加先の Room ID（`None` または空文字列ならゲスト Room を作成）
    /// * `username` - 表示名
    ///
    /// # Returns
    ///
    /// * `Ok(Room)` - 参加後の Room（参加者全員に updateMembers を送信済み）
    /// * `Err(JoinRoomError)` - 参加失敗（状態は変更されない）
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: Option<String>,
        username: String,
    ) -> Result<Room, JoinRoomError> {
        let (room_id, member) = self.prepare(connection_id, room_id, username)?;

        let _guard = self.broadcaster.lock().await;
        let room = self
            .repository
            .join(room_id, member)
            .await
            .map_err(rejected)?;
        self.announce(&room).await;

        Ok(room)
    }

    /// 参加中の Room `from` から別の Room へ移動
    ///
    /// 移動先が満員なら移動元に留まる（状態は変更されない）。成功時は移動元の残りの参加者に
    /// updateMembers と aiQueueUpdate を、移動先の参加者全員に updateMembers を送る。
    pub async fn switch(
        &self,
        connection_id: ConnectionId,
        from: &RoomId,
        room_id: Option<String>,
        username: String,
    ) -> Result<Room, JoinRoomError> {
        let (room_id, member) = self.prepare(connection_id, room_id, username)?;

        let _guard = self.broadcaster.lock().await;
        let (left, room) = self
            .repository
            .switch_room(from, room_id, member)
            .await
            .map_err(rejected)?;
        if let Some(left) = &left {
            tracing::info!(
                "Member moved from room '{}' to '{}' ({}/{} members left)",
                left.id,
                room.id,
                left.members.len(),
                left.capacity()
            );
            self.broadcaster.member_left(left).await;
        }
        self.announce(&room).await;

        Ok(room)
    }

    /// 入力を検証し、参加先の Room ID と参加者を作る
    fn prepare(
        &self,
        connection_id: ConnectionId,
        room_id: Option<String>,
        username: String,
    ) -> Result<(RoomId, Member), JoinRoomError> {
        let username = Username::new(username).map_err(JoinRoomError::InvalidUsername)?;
        let room_id = match room_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => RoomId::new(id).map_err(JoinRoomError::InvalidRoomId)?,
            None => RoomIdFactory::generate_guest().map_err(JoinRoomError::InvalidRoomId)?,
        };
        let member = Member::new(
            connection_id,
            username,
            Timestamp::new(self.clock.now_millis()),
        );
        Ok((room_id, member))
    }

    /// 参加後の参加者リストを Room 全員に送る
    async fn announce(&self, room: &Room) {
        tracing::info!(
            "Room '{}' now has {}/{} members",
            room.id,
            room.members.len(),
            room.capacity()
        );

        let event = ServerEvent::UpdateMembers(member_infos(room));
        if let Err(e) = self.broadcaster.to_targets(room.member_ids(), &event).await {
            tracing::warn!("Failed to broadcast member list of '{}': {}", room.id, e);
        }
    }
}

fn rejected(error: RepositoryError) -> JoinRoomError {
    match error {
        // 参加は Room を作成し、移動元は参加中の Room なので RoomNotFound は通常返らない
        RepositoryError::RoomFull | RepositoryError::RoomNotFound(_) => JoinRoomError::RoomFull,
    }
}
