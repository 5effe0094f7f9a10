//! UseCase: チャットメッセージ送信処理
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信者を含む Room の参加者全員への配信、履歴への記録
//! - 異常系：空のメッセージ
//! - エッジケース：存在しない Room（誰にも配信されない）

use std::sync::Arc;

use irori_shared::protocol::{ChatBroadcast, ServerEvent};

use crate::domain::{
    ChatLine, ConnectionId, MessageText, RepositoryError, RoomId, RoomRepository, Username,
};

use super::{broadcast::RoomBroadcaster, error::SendChatError};

/// チャットメッセージ送信のユースケース
pub struct SendChatUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: RoomBroadcaster,
}

impl SendChatUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, broadcaster: RoomBroadcaster) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    /// チャットメッセージを Room に配信
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - 配信先（送信者を含む）
    /// * `Err(SendChatError)` - 入力が不正、または配信に失敗
    pub async fn execute(
        &self,
        room_id: &RoomId,
        username: String,
        message: String,
    ) -> Result<Vec<ConnectionId>, SendChatError> {
        let username = Username::new(username).map_err(SendChatError::InvalidInput)?;
        let message = MessageText::new(message).map_err(SendChatError::InvalidInput)?;

        let _guard = self.broadcaster.lock().await;
        match self
            .repository
            .record_line(room_id, ChatLine::new(username.as_str(), message.as_str()))
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::RoomNotFound(_)) => {
                tracing::debug!("Chat message for unknown room '{}'", room_id);
            }
            Err(e) => tracing::warn!("Failed to record chat line: {}", e),
        }

        let event = ServerEvent::ChatMessage(ChatBroadcast {
            username: username.into_string(),
            message: message.into_string(),
            reply_to: None,
        });
        let targets = self.broadcaster.to_room(room_id, &event).await?;
        Ok(targets)
    }
}
