use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{CerebroError, Result};
use crate::model::ChatMessage;

/// Chat-completion client for the hosted model provider. Both supported
/// providers speak the OpenAI chat-completions protocol; they differ only in
/// base URL and where the API key comes from.
pub struct LlmService {
    provider: LlmProvider,
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("provider", &self.provider)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LlmProvider {
    GitHub,
    OpenAI,
}

impl LlmProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::GitHub => "https://models.github.ai/inference",
            Self::OpenAI => "https://api.openai.com/v1",
        }
    }

    fn default_env_var(self) -> &'static str {
        match self {
            Self::GitHub => "GITHUB_TOKEN",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl LlmService {
    /// Create an LLM service from configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "github" | "github-models" => LlmProvider::GitHub,
            "openai" => LlmProvider::OpenAI,
            other => {
                return Err(CerebroError::Config(format!(
                    "unknown LLM provider: '{other}' (expected 'github' or 'openai')"
                )));
            }
        };

        let api_key = resolve_api_key(config, provider.default_env_var())?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| CerebroError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider,
            config: config.clone(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One chat completion: `system` followed by the whole transcript,
    /// JSON-object output requested. Returns the raw content of the first choice.
    ///
    /// POST {base_url}/chat/completions
    pub async fn chat(&self, system: &str, transcript: &[ChatMessage]) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url());

        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(serde_json::json!({"role": "system", "content": system}));
        for msg in transcript {
            messages.push(serde_json::json!({"role": msg.role, "content": msg.content}));
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": {"type": "json_object"},
            "messages": messages,
        });

        tracing::debug!(
            model = %self.config.model,
            turns = transcript.len(),
            "sending chat completion"
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CerebroError::Provider(format!("chat completion request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CerebroError::Provider(format!(
                "chat completion error {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| {
            CerebroError::Provider(format!("chat completion response parse error: {e}"))
        })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CerebroError::Provider("chat completion response missing content".into()))
    }
}

/// Resolve an API key from config, a custom env var, or a default env var.
fn resolve_api_key(config: &LlmConfig, default_env_var: &str) -> Result<String> {
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }

    let env_var_name = config.env_var.as_deref().unwrap_or(default_env_var);

    std::env::var(env_var_name).map_err(|_| {
        CerebroError::Config(format!(
            "{} LLM provider requires an API key (set llm.api_key or {})",
            config.provider, env_var_name
        ))
    })
}
