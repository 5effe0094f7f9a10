//! エンティティ
//!
//! Room は参加者リスト・AI リクエストキュー・busy フラグ・直近のチャット履歴を保持します。
//!
//! ## 不変条件
//!
//! - 参加者数は `capacity`（既定 4）を超えない
//! - `busy` はドレイン処理（1 件の取り出し〜生成完了）の実行中のみ true
//! - キューは到着順（FIFO）に取り出される

use std::collections::VecDeque;

use irori_shared::protocol::queue_positions;
use serde::Serialize;

use super::{
    error::RoomError,
    value_object::{ConnectionId, MessageText, RoomId, Timestamp, Username},
};

/// Room の定員
pub const ROOM_CAPACITY: usize = 4;

/// Room が保持するチャット履歴の最大件数
pub const HISTORY_CAPACITY: usize = 50;

/// Room の参加者
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: ConnectionId,
    pub username: Username,
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(id: ConnectionId, username: Username, joined_at: Timestamp) -> Self {
        Self {
            id,
            username,
            joined_at,
        }
    }
}

/// AI キューに積まれた未処理のリクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub connection_id: ConnectionId,
    pub username: Username,
    pub text: MessageText,
    pub enqueued_at: Timestamp,
}

impl QueueEntry {
    pub fn new(
        connection_id: ConnectionId,
        username: Username,
        text: MessageText,
        enqueued_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            username,
            text,
            enqueued_at,
        }
    }
}

/// チャット履歴の 1 行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    /// 発言者の表示名（AI の場合は "AI"）
    pub author: String,
    pub text: String,
}

impl ChatLine {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// チャットルーム
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub members: Vec<Member>,
    pub queue: VecDeque<QueueEntry>,
    pub busy: bool,
    pub history: VecDeque<ChatLine>,
    pub created_at: Timestamp,
    capacity: usize,
}

impl Room {
    /// 定員 `ROOM_CAPACITY` の空の Room を作成
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_capacity(id, created_at, ROOM_CAPACITY)
    }

    pub fn with_capacity(id: RoomId, created_at: Timestamp, capacity: usize) -> Self {
        Self {
            id,
            members: Vec::new(),
            queue: VecDeque::new(),
            busy: false,
            history: VecDeque::new(),
            created_at,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// 参加者を追加
    ///
    /// 定員に達している場合は何も変更せずに `RoomError::Full` を返す。
    pub fn add_member(&mut self, member: Member) -> Result<(), RoomError> {
        if self.is_full() {
            return Err(RoomError::Full(self.capacity));
        }
        self.members.push(member);
        Ok(())
    }

    /// 参加者を追加、既に参加していれば同じ位置で置き換える
    ///
    /// 置き換えの場合は定員を確認しない。
    pub fn upsert_member(&mut self, member: Member) -> Result<(), RoomError> {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => {
                *existing = member;
                Ok(())
            }
            None => self.add_member(member),
        }
    }

    /// 参加者を削除（存在しない場合は false）
    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.id != connection_id);
        self.members.len() != before
    }

    pub fn has_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.iter().any(|m| &m.id == connection_id)
    }

    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    /// キューの末尾に追加し、追加後のキュー長を返す
    pub fn enqueue(&mut self, entry: QueueEntry) -> usize {
        self.queue.push_back(entry);
        self.queue.len()
    }

    /// 指定した接続が積んだ未処理のリクエストを削除し、削除件数を返す
    pub fn purge_entries_from(&mut self, connection_id: &ConnectionId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|e| &e.connection_id != connection_id);
        before - self.queue.len()
    }

    /// キューの各リクエストの順番 `[1, 2, ...]`
    pub fn queue_positions(&self) -> Vec<usize> {
        queue_positions(self.queue.len())
    }

    /// ドレインを開始して先頭のリクエストを取り出す
    ///
    /// busy フラグの確認と設定、先頭の取り出しを 1 つの操作で行う。
    /// 既にドレイン中、またはキューが空の場合は `None`（状態は変更しない）。
    pub fn begin_drain(&mut self) -> Option<QueueEntry> {
        if self.busy {
            return None;
        }
        let entry = self.queue.pop_front()?;
        self.busy = true;
        Some(entry)
    }

    /// ドレインを終了して busy フラグを下ろす
    ///
    /// 未処理のリクエストが残っていれば true。
    pub fn finish_drain(&mut self) -> bool {
        self.busy = false;
        !self.queue.is_empty()
    }

    /// チャット履歴に追加（最大 `HISTORY_CAPACITY` 件、古いものから破棄）
    pub fn record_line(&mut self, line: ChatLine) {
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(line);
    }

    /// 直近 `limit` 件のチャット履歴（古い順）
    pub fn recent_history(&self, limit: usize) -> Vec<ChatLine> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }
}
