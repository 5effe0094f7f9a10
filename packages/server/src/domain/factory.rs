//! 識別子の生成

use uuid::Uuid;

use super::{
    error::ValueObjectError,
    value_object::{ConnectionId, RoomId},
};

/// ゲスト Room ID の番号の上限（この値を含まない）
const GUEST_ROOM_RANGE: u128 = 10_000;

/// RoomId の生成
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// `guest<N>` 形式の RoomId を生成（N は 0..10000 の擬似乱数）
    pub fn generate_guest() -> Result<RoomId, ValueObjectError> {
        let number = Uuid::new_v4().as_u128() % GUEST_ROOM_RANGE;
        RoomId::new(format!("guest{}", number))
    }
}

/// ConnectionId の生成
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// UUID v4 の ConnectionId を生成
    pub fn generate() -> ConnectionId {
        ConnectionId::from_uuid(Uuid::new_v4())
    }
}
