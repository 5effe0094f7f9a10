//! TextGenerator trait 定義
//!
//! 外部のテキスト生成 API（Hugging Face / OpenAI / Gemini など）を抽象化します。
//! キューからは「プロンプトを 1 つ渡し、テキストかエラーを 1 つ受け取る」ことだけが見えます。

use async_trait::async_trait;

use super::{ChatLine, ProviderError};

/// 生成リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// ユーザーが AI に送ったメッセージ
    pub prompt: String,
    /// 直近のチャット履歴（古い順）。履歴を使わないプロバイダは無視する
    pub history: Vec<ChatLine>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatLine>) -> Self {
        self.history = history;
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// プロバイダ名（ログ用）
    fn name(&self) -> &'static str;

    /// テキストを生成
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
