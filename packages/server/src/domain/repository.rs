//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 原子性
//!
//! 各メソッドは 1 つの操作として原子的に実行されなければなりません。
//! 特に `begin_drain` の「busy フラグの確認・設定 + 先頭の取り出し」は、
//! 同じ Room に対する他の操作と交互に実行されてはいけません。

use async_trait::async_trait;

use super::{ChatLine, ConnectionId, Member, QueueEntry, RepositoryError, Room, RoomId};

/// ドレイン開始時に取り出されたリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainStart {
    /// 処理対象のリクエスト
    pub entry: QueueEntry,
    /// 取り出し後のキューの順番リスト
    pub remaining: Vec<usize>,
}

/// Room Registry
///
/// Room ID から Room への対応表。Room は最初の参加時に作成され、プロセスの終了まで削除されない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 参加者を Room に追加（Room が存在しなければ作成）
    ///
    /// 成功時は参加後の Room を返す。定員超過時は `RepositoryError::RoomFull`（状態は変更しない）。
    async fn join(&self, room_id: RoomId, member: Member) -> Result<Room, RepositoryError>;

    /// 参加中の Room `from` から Room `to` へ移動（`to` が存在しなければ作成）
    ///
    /// 移動先が満員なら何も変更せずに `RepositoryError::RoomFull` を返す。
    /// 成功時は (移動元, 移動先) の Room を返す。移動元からは参加者とその未処理リクエストが削除される。
    /// `from` と `to` が同じ場合は参加者情報を置き換えるだけで、移動元は `None`。
    async fn switch_room(
        &self,
        from: &RoomId,
        to: RoomId,
        member: Member,
    ) -> Result<(Option<Room>, Room), RepositoryError>;

    /// 全ての Room から接続を削除し、その接続の未処理リクエストも削除する
    ///
    /// 変更のあった Room（削除後の状態）を返す。
    async fn remove_connection(&self, connection_id: &ConnectionId) -> Vec<Room>;

    /// Room を取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全ての Room を取得（Room ID 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// Room の参加者の接続 ID（存在しない Room は空）
    async fn member_ids(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    /// AI キューに追加し、追加後の順番リストを返す
    async fn enqueue(
        &self,
        room_id: &RoomId,
        entry: QueueEntry,
    ) -> Result<Vec<usize>, RepositoryError>;

    /// ドレインを開始（既にドレイン中・キューが空・Room が存在しない場合は `None`）
    async fn begin_drain(&self, room_id: &RoomId) -> Option<DrainStart>;

    /// ドレインを終了（busy フラグを下ろす）し、未処理のリクエストが残っていれば true
    async fn finish_drain(&self, room_id: &RoomId) -> bool;

    /// チャット履歴に追加
    async fn record_line(&self, room_id: &RoomId, line: ChatLine) -> Result<(), RepositoryError>;

    /// 直近 `limit` 件のチャット履歴（古い順）
    async fn recent_history(&self, room_id: &RoomId, limit: usize) -> Vec<ChatLine>;
}
