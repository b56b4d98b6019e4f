use super::{ChatMessage, LLM, LLMConfig, LLMProvider, LLMResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible chat completions request body.
///
/// LM Studio serves the same wire format as OpenAI, so both providers share
/// these types and differ only in endpoint and authentication.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

fn extract_content(response: ChatCompletionResponse, provider: &str) -> Result<LLMResponse> {
    let content = response
        .choices
        .first()
        .ok_or_else(|| anyhow!("No response from {}", provider))?
        .message
        .content
        .clone();

    Ok(LLMResponse {
        content,
        tokens_used: response.usage.map(|u| u.total_tokens),
    })
}

/// LMStudio provider implementation
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| anyhow!("LMStudio endpoint not configured"))?;

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to LMStudio at {}", endpoint);

        let response = self.client.post(endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("LMStudio API error {}: {}", status, text));
        }

        extract_content(response.json().await?, "LMStudio")
    }

    async fn is_available(&self) -> bool {
        let endpoint = match &self.config.endpoint {
            Some(ep) => ep,
            None => return false,
        };

        let models_endpoint = endpoint.replace("/chat/completions", "/models");

        match self.client.get(&models_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .unwrap_or("https://api.openai.com/v1/chat/completions")
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key not configured"))?;

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        extract_content(response.json().await?, "OpenAI")
    }

    async fn is_available(&self) -> bool {
        if let Some(api_key) = &self.config.api_key {
            let url = self.endpoint().replace("/chat/completions", "/models");

            match self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_api_key() {
        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            api_key: None,
            ..Default::default()
        };
        assert!(OpenAIProvider::new(config).is_err());
    }

    #[test]
    fn test_extract_content() {
        let response = ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: "hello".to_string(),
                },
            }],
            usage: Some(ChatUsage { total_tokens: 12 }),
        };
        let out = extract_content(response, "test").unwrap();
        assert_eq!(out.content, "hello");
        assert_eq!(out.tokens_used, Some(12));
    }

    #[test]
    fn test_extract_content_empty_choices() {
        let response = ChatCompletionResponse {
            choices: vec![],
            usage: None,
        };
        assert!(extract_content(response, "test").is_err());
    }
}
