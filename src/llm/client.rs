// src/llm/client.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::CompletionService;
use crate::error::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Anthropic,
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(Error::Config(format!("unknown provider '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

pub fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

pub fn default_max_tokens() -> u32 {
    1024
}

pub fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

pub struct LlmClient {
    cfg: ProviderConfig,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(cfg: ProviderConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { cfg, http })
    }

    pub fn is_configured(&self) -> bool {
        !self.cfg.api_key.trim().is_empty()
    }
}

impl CompletionService for LlmClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(Error::Completion("API key not set".into()));
        }

        let (url, headers, body) = build_request(&self.cfg, prompt);
        debug!(model = %self.cfg.model, %url, "requesting completion");

        let mut req = self.http.post(url).json(&body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send().map_err(|e| Error::Completion(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp.json().map_err(|e| Error::Completion(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Completion(format!("LLM error {status}: {json}")));
        }

        extract_text(self.cfg.provider, &json).map(|t| t.trim().to_string())
    }
}

fn build_request(cfg: &ProviderConfig, prompt: &str) -> (String, Vec<(&'static str, String)>, Value) {
    match cfg.provider {
        Provider::OpenAI => {
            let url = cfg.base_url.clone().unwrap_or_else(|| OPENAI_URL.into());

            let body = serde_json::json!({
                "model": cfg.model,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
                "max_tokens": cfg.max_tokens,
                "temperature": cfg.temperature,
            });

            (
                url,
                vec![("Authorization", format!("Bearer {}", cfg.api_key))],
                body,
            )
        }

        Provider::Anthropic => {
            let url = cfg.base_url.clone().unwrap_or_else(|| ANTHROPIC_URL.into());

            let body = serde_json::json!({
                "model": cfg.model,
                "max_tokens": cfg.max_tokens,
                "temperature": cfg.temperature,
                "messages": [
                    { "role": "user", "content": prompt }
                ]
            });

            (
                url,
                vec![
                    ("x-api-key", cfg.api_key.clone()),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body,
            )
        }
    }
}

fn extract_text(provider: Provider, v: &Value) -> Result<String> {
    let text = match provider {
        Provider::OpenAI => v.pointer("/choices/0/message/content"),
        Provider::Anthropic => v.pointer("/content/0/text"),
    };

    text.and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Completion(format!("{provider:?} response parse failure")))
}
