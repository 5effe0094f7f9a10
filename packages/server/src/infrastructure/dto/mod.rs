//! Data Transfer Objects (DTOs)
//!
//! - WebSocket のイベントは `irori_shared::protocol` で定義（クライアントと共有）
//! - `http`: HTTP API レスポンス
//! - `conversion`: ドメインモデルとの変換

pub mod conversion;
pub mod http;
