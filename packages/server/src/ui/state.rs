//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    AiQueueUseCase, ConnectClientUseCase, DisconnectClientUseCase, GetRoomDetailUseCase,
    GetRoomsUseCase, JoinRoomUseCase, RoomBroadcaster, SendChatUseCase,
};

/// Handler から参照する UseCase 一式
pub struct AppState {
    /// ConnectClientUseCase（クライアント接続のユースケース）
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// DisconnectClientUseCase（クライアント切断・Room 退出のユースケース）
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    /// JoinRoomUseCase（Room 参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendChatUseCase（チャット送信のユースケース）
    pub send_chat_usecase: Arc<SendChatUseCase>,
    /// AiQueueUseCase（AI リクエストキューのユースケース）
    pub ai_queue_usecase: Arc<AiQueueUseCase>,
    /// GetRoomsUseCase（Room 一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（Room 詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// 個別のクライアントへの応答（joinRoomResult / error）に使う
    pub broadcaster: RoomBroadcaster,
    /// /health で返すモデル名
    pub model: String,
}
