//! OpenAI 互換 Chat Completions API アダプタ
//!
//! 直近のチャット履歴を文脈として送ります。AI 自身の発言は `assistant`、
//! それ以外は `"{author}: {text}"` 形式の `user` メッセージになります。

use async_trait::async_trait;
use irori_shared::protocol::AI_USERNAME;
use serde::{Deserialize, Serialize};

use crate::domain::{GenerationRequest, ProviderError, TextGenerator};

use super::{ProviderSettings, network_error, read_body};

const PROVIDER_NAME: &str = "OpenAI";

const SYSTEM_PROMPT: &str = "You are a helpful assistant taking part in a small group chat. \
Messages from participants are prefixed with their name.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage>,
    max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ChatCompletionMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionContent {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }
}

/// 履歴とプロンプトから messages を組み立てる
fn build_messages(request: &GenerationRequest) -> Vec<ChatCompletionMessage> {
    let mut messages = vec![ChatCompletionMessage {
        role: "system",
        content: SYSTEM_PROMPT.to_string(),
    }];
    messages.extend(request.history.iter().map(|line| {
        if line.author == AI_USERNAME {
            ChatCompletionMessage {
                role: "assistant",
                content: line.text.clone(),
            }
        } else {
            ChatCompletionMessage {
                role: "user",
                content: format!("{}: {}", line.author, line.text),
            }
        }
    }));
    messages.push(ChatCompletionMessage {
        role: "user",
        content: request.prompt.clone(),
    });
    messages
}

/// レスポンス本文から `choices[0].message.content` を取り出す
fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: build_messages(request),
            max_tokens: self.max_tokens,
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
        parse_completion(&text)
    }
}
