use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use lendbot_core::config::LlmConfig;

/// Anthropic text-completion turn marker; generation stops before the model
/// starts speaking for the user.
pub const HUMAN_STOP_SEQUENCE: &str = "\n\nHuman:";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text completions through `bedrock-runtime` `InvokeModel`.
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct BedrockCompletionRequest<'a> {
    prompt: &'a str,
    max_tokens_to_sample: u32,
    stop_sequences: [&'a str; 1],
}

#[derive(Deserialize)]
struct BedrockCompletionResponse {
    completion: String,
}

impl BedrockClient {
    pub fn new(client: aws_sdk_bedrockruntime::Client, config: &LlmConfig) -> Self {
        Self { client, model_id: config.model.clone(), max_tokens: config.max_tokens }
    }
}

#[async_trait]
impl LlmClient for BedrockClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::to_vec(&BedrockCompletionRequest {
            prompt,
            max_tokens_to_sample: self.max_tokens,
            stop_sequences: [HUMAN_STOP_SEQUENCE],
        })?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|error| {
                anyhow!(
                    "bedrock invoke_model failed: {}",
                    aws_sdk_bedrockruntime::error::DisplayErrorContext(&error)
                )
            })?;

        let response: BedrockCompletionResponse = serde_json::from_slice(output.body().as_ref())
            .context("bedrock response had no `completion` field")?;
        Ok(response.completion)
    }
}

/// Local models served by Ollama's `/api/generate`.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("llm.base_url is required for the ollama provider"))?;
        Ok(Self { http: http_client(config)?, base_url, model: config.model.clone() })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&OllamaGenerateRequest { model: &self.model, prompt, stream: false })
            .send()
            .await
            .with_context(|| format!("ollama request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("ollama returned {}", response.status());
        }
        let body: OllamaGenerateResponse =
            response.json().await.context("failed to decode ollama response")?;
        Ok(body.response)
    }
}

/// Any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    stop: [&'a str; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("llm.base_url is required for the openai provider"))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("llm.api_key is required for the openai provider"))?;
        Ok(Self {
            http: http_client(config)?,
            base_url,
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&ChatRequest {
                model: &self.model,
                messages: [ChatMessage { role: "user", content: prompt }],
                max_tokens: self.max_tokens,
                stop: [HUMAN_STOP_SEQUENCE],
            })
            .send()
            .await
            .with_context(|| format!("chat completion request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("chat completion endpoint returned {}", response.status());
        }
        let body: ChatResponse =
            response.json().await.context("failed to decode chat completion response")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))
    }
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build http client")
}

#[cfg(test)]
mod tests {
    use lendbot_core::config::{AppConfig, LlmConfig, LlmProvider};
    use secrecy::SecretString;

    use super::{BedrockCompletionRequest, OllamaClient, OpenAiClient, HUMAN_STOP_SEQUENCE};

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig { provider, base_url: None, ..AppConfig::default().llm }
    }

    #[test]
    fn bedrock_body_uses_text_completion_fields() {
        let body = serde_json::to_value(BedrockCompletionRequest {
            prompt: "\n\nHuman: hi \n\nAssistant:",
            max_tokens_to_sample: 350,
            stop_sequences: [HUMAN_STOP_SEQUENCE],
        })
        .expect("serialize");

        assert_eq!(body["max_tokens_to_sample"], 350);
        assert_eq!(body["stop_sequences"][0], "\n\nHuman:");
        assert!(body["prompt"].as_str().expect("prompt").ends_with("Assistant:"));
    }

    #[test]
    fn http_clients_need_their_endpoint_settings() {
        assert!(OllamaClient::from_config(&config(LlmProvider::Ollama)).is_err());

        let mut openai = config(LlmProvider::OpenAi);
        openai.base_url = Some("https://llm.internal".to_string());
        assert!(OpenAiClient::from_config(&openai).is_err());

        openai.api_key = Some(SecretString::from("sk-test".to_string()));
        assert!(OpenAiClient::from_config(&openai).is_ok());
    }
}
