//! Domain layer
//!
//! Room / Member / QueueEntry のエンティティ、値オブジェクト、
//! およびインフラ層が実装するインターフェース（trait）を定義します。

pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod repository;
pub mod text_generator;
pub mod value_object;

pub use entity::{ChatLine, HISTORY_CAPACITY, Member, QueueEntry, ROOM_CAPACITY, Room};
pub use error::{MessagePushError, ProviderError, RepositoryError, RoomError, ValueObjectError};
pub use factory::{ConnectionIdFactory, RoomIdFactory};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{DrainStart, RoomRepository};
pub use text_generator::{GenerationRequest, TextGenerator};
pub use value_object::{ConnectionId, MessageText, RoomId, Timestamp, Username};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use text_generator::MockTextGenerator;
