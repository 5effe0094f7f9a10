//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is too long ({actual} > {max} characters)")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Room エンティティの操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// 定員に達している
    #[error("Room is full (capacity: {0})")]
    Full(usize),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room is full")]
    RoomFull,

    #[error("Room '{0}' not found")]
    RoomNotFound(String),
}

impl From<RoomError> for RepositoryError {
    fn from(error: RoomError) -> Self {
        match error {
            RoomError::Full(_) => Self::RoomFull,
        }
    }
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

/// テキスト生成プロバイダのエラー
///
/// どのバリアントも Room のチャットに "AI" の発言として表示されます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// 通信エラー（接続失敗、タイムアウトなど）
    #[error("Error: AI failed to respond ({0})")]
    Network(String),

    /// 成功以外の HTTP ステータス
    #[error("{provider} API Error ({status}): {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// レスポンスから生成テキストを取り出せない
    #[error("Error: malformed AI response ({0})")]
    Malformed(String),

    /// アダプタ内部で panic が発生した
    #[error("Error: AI failed to respond (generator panicked)")]
    Panicked,
}
