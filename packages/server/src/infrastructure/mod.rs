//! Infrastructure layer
//!
//! ドメイン層が定義する trait の具体的な実装を提供します。
//!
//! - `repository`: Room Registry（インメモリ）
//! - `message_pusher`: WebSocket によるメッセージ送信
//! - `provider`: 外部テキスト生成 API のアダプタ
//! - `dto`: 通信用のデータ転送オブジェクト

pub mod dto;
pub mod message_pusher;
pub mod provider;
pub mod repository;
