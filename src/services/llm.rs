use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::core::config::Config;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub openai: OpenAIConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_delay_ms: 0,
            system_prompt: default_system_prompt(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_retry_count() -> usize {
    3
}
fn default_model() -> String {
    "gpt-4".to_string()
}
fn default_system_prompt() -> String {
    "You are a creative storyteller. Generate unique and engaging stories based on user input."
        .to_string()
}

impl LlmConfig {
    /// The configured key wins over the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.openai
            .api_key
            .clone()
            .or_else(|| lookup(API_KEY_ENV))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .with_context(|| {
                format!(
                    "No API key found. Set {} (a .env file works) or llm.openai.api_key in config.yml",
                    API_KEY_ENV
                )
            })
    }
}

pub fn create_llm(config: &Config) -> Result<Box<dyn LlmClient>> {
    let api_key = config.llm.resolve_api_key()?;
    let openai = &config.llm.openai;
    Ok(Box::new(OpenAIClient::new(
        &api_key,
        &openai.model,
        openai.base_url.as_deref(),
    )))
}

// --- OpenAI ---

#[derive(Debug)]
struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

impl OpenAIResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI response empty or missing content"))
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("POST {} (model {})", url, self.model);

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage { role: "system".to_string(), content: system.to_string() },
                OpenAIMessage { role: "user".to_string(), content: user.to_string() },
            ],
        };

        let resp = self.client.post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let result: OpenAIResponse = resp.json().await?;
        result.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_response_parsing_success() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1677652288,
            "model": "gpt-4-0613",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "The lighthouse had not been lit in years."
                },
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 9,
                "completion_tokens": 12,
                "total_tokens": 21
            }
        }"#;

        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.into_text().unwrap(),
            "The lighthouse had not been lit in years."
        );
    }

    #[test]
    fn test_openai_response_null_content_is_error() {
        let json = r#"{ "choices": [{ "message": { "role": "assistant", "content": null } }] }"#;
        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert!(result.into_text().is_err());
    }

    #[test]
    fn test_openai_response_no_choices_is_error() {
        let result: OpenAIResponse = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        assert!(result.into_text().is_err());
    }

    #[test]
    fn test_request_serializes_system_then_user() {
        let request = OpenAIRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                OpenAIMessage { role: "system".to_string(), content: "be dark".to_string() },
                OpenAIMessage { role: "user".to_string(), content: "tell me".to_string() },
            ],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "tell me");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAIClient::new("key", "gpt-4", Some("http://localhost:8080/v1/"));
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_api_key_prefers_config() {
        let mut config = LlmConfig::default();
        config.openai.api_key = Some("from-config".to_string());
        let key = config
            .resolve_api_key_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn test_api_key_falls_back_to_env() {
        let config = LlmConfig::default();
        let key = config
            .resolve_api_key_with(|name| (name == API_KEY_ENV).then(|| "sk-env".to_string()))
            .unwrap();
        assert_eq!(key, "sk-env");
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut config = LlmConfig::default();
        config.openai.api_key = Some("   ".to_string());
        assert!(config.resolve_api_key_with(|_| None).is_err());
    }
}
