//! Broadcast Relay
//!
//! ServerEvent を JSON にして、Room の参加者全員（送信者を含む）に送ります。
//!
//! ## 通知の順序
//!
//! Room の状態を変更する処理は `lock()` のガードを保持したまま状態の変更と通知を行います。
//! これにより、クライアントが受け取るイベントの順序は状態の変更順と一致します。
//! ガードを保持したまま外部 API を呼び出してはいけません。

use std::sync::Arc;

use irori_shared::protocol::ServerEvent;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    domain::{ConnectionId, MessagePusher, Room, RoomId, RoomRepository},
    infrastructure::dto::conversion::member_infos,
};

use super::error::BroadcastError;

/// Room 単位のブロードキャスト
#[derive(Clone)]
pub struct RoomBroadcaster {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    /// 状態の変更と通知を直列化するロック（clone 間で共有）
    sequence: Arc<Mutex<()>>,
}

impl RoomBroadcaster {
    pub fn new(repository: Arc<dyn RoomRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            repository,
            message_pusher,
            sequence: Arc::new(Mutex::new(())),
        }
    }

    /// 状態の変更と通知の間に保持するガードを取得
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.sequence.lock().await
    }

    /// Room の現在の参加者全員に送信し、送信対象を返す
    pub async fn to_room(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
    ) -> Result<Vec<ConnectionId>, BroadcastError> {
        let targets = self.repository.member_ids(room_id).await;
        self.to_targets(targets.clone(), event).await?;
        Ok(targets)
    }

    /// 指定した接続に送信
    pub async fn to_targets(
        &self,
        targets: Vec<ConnectionId>,
        event: &ServerEvent,
    ) -> Result<(), BroadcastError> {
        if targets.is_empty() {
            return Ok(());
        }
        let json = serialize(event)?;
        self.message_pusher.broadcast(targets, &json).await?;
        Ok(())
    }

    /// 1 つの接続に送信
    pub async fn to_client(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), BroadcastError> {
        let json = serialize(event)?;
        self.message_pusher.push_to(connection_id, &json).await?;
        Ok(())
    }

    /// 参加者が抜けた Room の残りの参加者に updateMembers と aiQueueUpdate を送る
    pub async fn member_left(&self, room: &Room) {
        let targets = room.member_ids();
        let events = [
            ServerEvent::UpdateMembers(member_infos(room)),
            ServerEvent::AiQueueUpdate(room.queue_positions()),
        ];
        for event in &events {
            if let Err(e) = self.to_targets(targets.clone(), event).await {
                tracing::warn!("Failed to notify room '{}': {}", room.id, e);
            }
        }
    }
}

fn serialize(event: &ServerEvent) -> Result<String, BroadcastError> {
    event
        .to_json()
        .map_err(|e| BroadcastError::Serialize(e.to_string()))
}
