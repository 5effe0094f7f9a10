//! UseCase layer
//!
//! ビジネスロジックを Repository / MessagePusher / TextGenerator の trait 越しに実行します。

mod ai_queue;
mod broadcast;
mod connect_client;
mod disconnect_client;
mod error;
mod get_rooms;
mod join_room;
mod send_chat;

pub use ai_queue::{AiQueueSettings, AiQueueUseCase, EnqueueOutcome};
pub use broadcast::RoomBroadcaster;
pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use error::{BroadcastError, EnqueueError, GetRoomDetailError, JoinRoomError, SendChatError};
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use join_room::JoinRoomUseCase;
pub use send_chat::SendChatUseCase;
