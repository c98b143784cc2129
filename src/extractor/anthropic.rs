//! Anthropic Messages API による住所抽出

use super::payload::ImagePayload;
use super::AddressExtractor;
use crate::error::{RouteAiError, Result};
use async_trait::async_trait;
use route_ai_common::build_extraction_prompt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub struct AnthropicExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| RouteAiError::Config(format!("HTTPクライアント作成エラー: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: crate::ai_provider::AiProvider::Anthropic.default_base_url().to_string(),
        })
    }

    /// 接続先を変更（テスト・プロキシ用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, image: &ImagePayload) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Text {
                        text: build_extraction_prompt(),
                    },
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: image.media_type.clone(),
                            data: image.data.clone(),
                        },
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl AddressExtractor for AnthropicExtractor {
    async fn extract_text(&self, image: &ImagePayload) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(image))
            .send()
            .await
            .map_err(|e| RouteAiError::ProcessingFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), file = %image.file_name, "Anthropic API error: {}", body);
            return Err(RouteAiError::from_api_status(
                status.as_u16(),
                format!("Anthropic API error: {}", status),
            ));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RouteAiError::ApiParse(e.to_string()))?;

        // 最初のテキストブロックのみ使う
        let text = body
            .content
            .into_iter()
            .find_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .unwrap_or_default();

        Ok(text)
    }
}
