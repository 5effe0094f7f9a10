//! UseCase: クライアント切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::leave_rooms() / execute() メソッド
//! - 全 Room からの削除と、変更のあった Room への updateMembers / aiQueueUpdate の通知
//!
//! ### なぜこのテストが必要か
//! - 切断したクライアントの未処理の AI リクエストが残ると、誰もいない相手に回答することになる
//! - 処理中のリクエストは切断後も最後まで処理される（Room に結果が届く）
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断と残りの参加者への通知
//! - エッジケース：最後の参加者の切断（Room は残る）、Room に参加していない接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRepository};

use super::broadcast::RoomBroadcaster;

/// クライアント切断のユースケース
pub struct DisconnectClientUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    broadcaster: RoomBroadcaster,
}

impl DisconnectClientUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        broadcaster: RoomBroadcaster,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            broadcaster,
        }
    }

    /// 接続を全ての Room から退出させる
    ///
    /// 変更のあった Room ごとに、残りの参加者へ updateMembers と aiQueueUpdate を送る。
    /// 接続自体の登録は解除しない。
    ///
    /// # Returns
    ///
    /// 変更のあった Room の ID リスト
    pub async fn leave_rooms(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let _guard = self.broadcaster.lock().await;
        let affected = self.repository.remove_connection(connection_id).await;

        for room in &affected {
            tracing::info!(
                "'{}' left room '{}' ({}/{} members)",
                connection_id,
                room.id,
                room.members.len(),
                room.capacity()
            );
            self.broadcaster.member_left(room).await;
        }

        affected.into_iter().map(|room| room.id).collect()
    }

    /// 切断を実行（全 Room から退出し、送信チャンネルの登録を解除する）
    pub async fn execute(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let rooms = self.leave_rooms(connection_id).await;
        self.message_pusher.unregister_client(connection_id).await;
        rooms
    }
}
