//! Hugging Face Inference API アダプタ
//!
//! `POST {base_url}/models/{model}` に `{inputs, parameters: {max_new_tokens}}` を送ります。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{GenerationRequest, ProviderError, TextGenerator};

use super::{ProviderSettings, RAW_RESPONSE_MAX_CHARS, network_error, read_body, truncate_chars};

const PROVIDER_NAME: &str = "HF";

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
}

pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_new_tokens: u32,
}

impl HuggingFaceGenerator {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/models/{}",
                settings.base_url.trim_end_matches('/'),
                settings.model
            ),
            api_key: settings.api_key.clone(),
            max_new_tokens: settings.max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = InferenceRequest {
            inputs: &request.prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let text = read_body(PROVIDER_NAME, response).await?;
        Ok(extract_generated_text(&text))
    }
}

/// レスポンス本文から生成テキストを取り出す
///
/// 1. `[{"generated_text": "..."}]`
/// 2. `{"generated_text": "..."}`
/// 3. JSON 文字列
/// 4. 上記以外の JSON はそのまま（最大 1000 文字）
/// 5. JSON でなければ本文そのまま
pub fn extract_generated_text(body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("HF response is not JSON; using raw text");
            return body.to_string();
        }
    };

    let generated = |item: &Value| {
        item.get("generated_text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    match &value {
        Value::Array(items) => items.first().and_then(generated),
        Value::Object(_) => generated(&value),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
    .unwrap_or_else(|| truncate_chars(&value.to_string(), RAW_RESPONSE_MAX_CHARS))
}
