//! Server configuration from command-line flags and environment variables.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::{
    infrastructure::provider::{ProviderKind, ProviderSettings},
    usecase::AiQueueSettings,
};

#[derive(Parser, Debug)]
#[command(name = "irori-server")]
#[command(about = "Group chat server with a per-room AI request queue", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Text generation provider
    #[arg(long, env = "AI_PROVIDER", value_enum, default_value_t = ProviderKind::Huggingface)]
    pub provider: ProviderKind,

    /// API key of the provider
    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name (defaults to the provider's default model)
    #[arg(long, env = "AI_MODEL")]
    pub model: Option<String>,

    /// Override the provider's API base URL
    #[arg(long, env = "AI_PROVIDER_BASE_URL")]
    pub provider_base_url: Option<String>,

    /// Maximum number of tokens to generate
    #[arg(long, env = "AI_MAX_TOKENS", default_value = "150")]
    pub max_tokens: u32,

    /// Number of recent chat lines sent to the provider as context
    #[arg(long, env = "AI_HISTORY_SIZE", default_value = "6")]
    pub history_size: usize,

    /// Pause between two AI requests of the same room, in milliseconds
    #[arg(long, env = "AI_DRAIN_DELAY_MS", default_value = "200")]
    pub drain_delay_ms: u64,

    /// Timeout of one provider request, in seconds
    #[arg(long, env = "AI_REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing API key: set AI_API_KEY or pass --api-key")]
    MissingApiKey,
}

/// Validated server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub provider: ProviderSettings,
    pub queue: AiQueueSettings,
}

impl Args {
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let kind = self.provider;
        let provider = ProviderSettings {
            kind,
            api_key,
            model: self
                .model
                .unwrap_or_else(|| kind.default_model().to_string()),
            base_url: self
                .provider_base_url
                .unwrap_or_else(|| kind.default_base_url().to_string()),
            max_tokens: self.max_tokens,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            provider,
            queue: AiQueueSettings {
                history_size: self.history_size,
                drain_delay: Duration::from_millis(self.drain_delay_ms),
            },
        })
    }
}
