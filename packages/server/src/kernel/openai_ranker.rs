use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseRankingProvider, RankingError};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// GPT-4o Mini, the default ranking model.
pub const GPT_4O_MINI: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.1;

/// OpenAI chat completions client used for gym ranking
pub struct OpenAiRanker {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiRanker {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RankingError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RankingError::Config("OpenAI API key is empty".to_string()));
        }

        Ok(Self {
            api_key,
            model: GPT_4O_MINI.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl BaseRankingProvider for OpenAiRanker {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, RankingError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RankingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| RankingError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(RankingError::EmptyResponse)
    }
}
