//! Remote vision/text provider client
//!
//! Talks to an OpenAI-style chat-completions endpoint (Zhipu GLM by default)
//! with bearer authentication. Used for both the vision fallback and the
//! text enrichment. Every call is attempted exactly once; the HTTP client's
//! timeout bounds each one.

use async_trait::async_trait;
use flora_common::config::CloudConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::cloud_vision::{CloudOutcome, VisionProvider};
use super::enrichment::InfoProvider;

const USER_AGENT: &str = concat!("flora-id/", env!("CARGO_PKG_VERSION"));

const VISION_INSTRUCTION: &str =
    "请识别这张图片中的花卉。只返回花卉的标准中文名称，不要包含任何其他文字、标点或解释。";

const BOTANIST_SYSTEM_PROMPT: &str = "你是一位植物学家,擅长用简洁优美的语言介绍花卉。";

/// Remote provider errors
#[derive(Debug, Error)]
pub enum CloudError {
    /// No credential available; the provider is never contacted
    #[error("Remote provider not configured (no API key)")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatMessage {
    fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.into()),
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text.into()),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Chat-completions client for the remote provider
pub struct ZhipuClient {
    http_client: reqwest::Client,
    api_key: String,
    config: CloudConfig,
}

impl ZhipuClient {
    pub fn new(api_key: String, config: CloudConfig) -> Result<Self, CloudError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            config,
        })
    }

    /// Send one chat request and return the first choice's text
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, CloudError> {
        tracing::debug!(model = request.model, "Querying remote provider");

        let response = self
            .http_client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CloudError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CloudError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CloudError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CloudError::Parse(e.to_string()))?;

        first_content(chat)
    }
}

fn first_content(chat: ChatResponse) -> Result<String, CloudError> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(CloudError::EmptyResponse)
}

/// Remove markdown code fences (```json ... ```) around generated JSON
pub fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

fn info_prompt(species_name: &str) -> String {
    format!(
        r#"请为"{species_name}"生成花卉百科信息。

要求：
1. 必须返回纯 JSON 格式，不要包含任何其他文字或 markdown 标记
2. JSON 结构如下：
{{
  "poem": "与该花卉相关的著名诗词 (必须包含上下句，用逗号分隔，如：'采菊东篱下，悠然见南山')",
  "botany": "植物学特征简述 (科属、形态等，50字以内)",
  "description": "用优美的语言简短介绍这种花（30字以内）",
  "care": "养护核心要点。必须且仅包含四行，格式如下：\n水分：[描述]\n阳光：[描述]\n土壤：[描述]\n温度：[描述]\n每行25字以内。",
  "culture": "花语或文化寓意 (30字以内)"
}}

请直接返回 JSON，不要添加任何前缀或后缀。"#
    )
}

#[async_trait]
impl VisionProvider for ZhipuClient {
    async fn identify(&self, image_base64: &str) -> Result<CloudOutcome, CloudError> {
        let name = self
            .complete(ChatRequest {
                model: &self.config.vision_model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: VISION_INSTRUCTION.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_base64.to_string(),
                            },
                        },
                    ]),
                }],
                temperature: None,
                top_p: None,
                max_tokens: None,
            })
            .await?;

        let description = self
            .complete(ChatRequest {
                model: &self.config.text_model,
                messages: vec![ChatMessage::user(format!(
                    "请用一句话简短介绍一下{}这种花（30字以内）。",
                    name
                ))],
                temperature: None,
                top_p: None,
                max_tokens: None,
            })
            .await?;

        Ok(CloudOutcome { name, description })
    }
}

#[async_trait]
impl InfoProvider for ZhipuClient {
    async fn generate_info(&self, species_name: &str) -> Result<String, CloudError> {
        let content = self
            .complete(ChatRequest {
                model: &self.config.text_model,
                messages: vec![
                    ChatMessage::system(BOTANIST_SYSTEM_PROMPT),
                    ChatMessage::user(info_prompt(species_name)),
                ],
                temperature: Some(0.7),
                top_p: Some(0.9),
                max_tokens: Some(512),
            })
            .await?;

        let content = strip_code_fences(&content);
        serde_json::from_str::<serde_json::Value>(&content)
            .map_err(|e| CloudError::Parse(e.to_string()))?;
        Ok(content)
    }
}

/// Provider used when no credential is configured
///
/// Never touches the network; every call reports [`CloudError::NotConfigured`].
#[derive(Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl VisionProvider for UnconfiguredProvider {
    async fn identify(&self, _image_base64: &str) -> Result<CloudOutcome, CloudError> {
        Err(CloudError::NotConfigured)
    }
}

#[async_trait]
impl InfoProvider for UnconfiguredProvider {
    async fn generate_info(&self, _species_name: &str) -> Result<String, CloudError> {
        Err(CloudError::NotConfigured)
    }
}
