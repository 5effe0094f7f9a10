//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{MessagePushError, ValueObjectError};

/// ブロードキャストのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("Failed to serialize event: {0}")]
    Serialize(String),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// Room 参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("Invalid username: {0}")]
    InvalidUsername(ValueObjectError),

    #[error("Invalid room id: {0}")]
    InvalidRoomId(ValueObjectError),

    /// 定員超過（要求者にのみ通知し、ブロードキャストしない）
    #[error("Room full")]
    RoomFull,
}

impl JoinRoomError {
    /// `joinRoomResult` に載せるメッセージ
    pub fn client_message(&self) -> &'static str {
        match self {
            JoinRoomError::InvalidUsername(_) => "Invalid username",
            JoinRoomError::InvalidRoomId(_) => "Invalid room id",
            JoinRoomError::RoomFull => irori_shared::protocol::ROOM_FULL_MESSAGE,
        }
    }
}

/// チャット送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendChatError {
    #[error("Invalid chat message: {0}")]
    InvalidInput(ValueObjectError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// AI キュー追加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("Invalid AI request: {0}")]
    InvalidInput(ValueObjectError),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),
}

/// Room 詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Invalid room id")]
    InvalidRoomId,

    #[error("Room not found")]
    RoomNotFound,
}
