//! テキスト生成プロバイダのアダプタ
//!
//! どのアダプタも `TextGenerator` を実装し、キューからは区別できません。
//! 使用するアダプタは起動時の設定（`ProviderKind`）で選択されます。
//!
//! - `huggingface`: Hugging Face Inference API
//! - `openai`: OpenAI 互換の Chat Completions API（直近の履歴を文脈として送る）
//! - `gemini`: Google Generative Language API（generateContent）

pub mod gemini;
pub mod huggingface;
pub mod openai;

use std::{fmt, sync::Arc, time::Duration};

use clap::ValueEnum;

use crate::domain::{ProviderError, TextGenerator};

pub use gemini::GeminiGenerator;
pub use huggingface::HuggingFaceGenerator;
pub use openai::OpenAiGenerator;

/// 生成テキストを JSON のまま返す場合の最大文字数
pub const RAW_RESPONSE_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Huggingface,
    Openai,
    Gemini,
}

impl ProviderKind {
    /// モデル未指定時に使うモデル
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Huggingface => "gpt2",
            ProviderKind::Openai => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }

    /// API のベース URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Huggingface => "https://api-inference.huggingface.co",
            ProviderKind::Openai => "https://api.openai.com",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Huggingface => write!(f, "huggingface"),
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

/// アダプタの生成に必要な設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

/// 設定に応じたアダプタを生成
pub fn build_generator(
    settings: &ProviderSettings,
) -> Result<Arc<dyn TextGenerator>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()?;

    let generator: Arc<dyn TextGenerator> = match settings.kind {
        ProviderKind::Huggingface => Arc::new(HuggingFaceGenerator::new(client, settings)),
        ProviderKind::Openai => Arc::new(OpenAiGenerator::new(client, settings)),
        ProviderKind::Gemini => Arc::new(GeminiGenerator::new(client, settings)),
    };
    Ok(generator)
}

/// reqwest のエラーを通信エラーに変換
pub(crate) fn network_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Network(format!("request timed out: {}", error))
    } else {
        ProviderError::Network(error.to_string())
    }
}

/// 文字数で切り詰める（マルチバイト文字の途中で切らない）
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// ステータスを確認して本文を取得
///
/// 成功以外のステータスは本文付きの `ProviderError::Status` になる。
pub(crate) async fn read_body(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
