/// LLM Client — the single point of entry for all completion calls in the review API.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through `CompletionService`.
///
/// Failures are transient by contract: one attempt per call, no retries.
/// Callers decide how to degrade.
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// An image sent inline with a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub media_type: String,
    /// Base64 (standard alphabet) payload.
    pub data: String,
}

impl InlineImage {
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        let data = STANDARD.encode(bytes);
        debug!("Encoded image → {} bytes base64", data.len());
        Self {
            media_type: media_type.into(),
            data,
        }
    }
}

/// A single-turn completion request: optional system prompt, user text, and
/// any number of images placed before the text.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<InlineImage>,
}

impl CompletionRequest {
    pub fn text(system: &str, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.to_string()),
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(system: &str, prompt: impl Into<String>, images: Vec<InlineImage>) -> Self {
        Self {
            system: Some(system.to_string()),
            prompt: prompt.into(),
            images,
        }
    }
}

/// Seam between the synthesis pipeline and the hosted completion service.
/// `AppState` carries an `Arc<dyn CompletionService>` so tests can swap in a mock.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the text of the first text block of the completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Calls the service and deserializes the reply as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    service: &dyn CompletionService,
    request: &CompletionRequest,
) -> Result<T, LlmError> {
    let text = service.complete(request).await?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(text).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Blocks(Vec<RequestBlock<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn build_request_body<'a>(
    model: &'a str,
    max_tokens: u32,
    request: &'a CompletionRequest,
) -> AnthropicRequest<'a> {
    let content = if request.images.is_empty() {
        MessageContent::Text(&request.prompt)
    } else {
        let mut blocks: Vec<RequestBlock<'a>> = request
            .images
            .iter()
            .map(|image| RequestBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: &image.media_type,
                    data: &image.data,
                },
            })
            .collect();
        blocks.push(RequestBlock::Text {
            text: &request.prompt,
        });
        MessageContent::Blocks(blocks)
    };

    AnthropicRequest {
        model,
        max_tokens,
        system: request.system.as_deref(),
        messages: vec![AnthropicMessage {
            role: "user",
            content,
        }],
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The production completion client. Wraps the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.anthropic_api_key.clone(),
            api_url: config.llm_api_url.clone(),
            model: config.llm_model.clone(),
            max_tokens: config.llm_max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    pub async fn call(&self, request: &CompletionRequest) -> Result<LlmResponse, LlmError> {
        let body = build_request_body(&self.model, self.max_tokens, request);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage {
            debug!(
                "LLM call succeeded: images={}, input_tokens={}, output_tokens={}",
                request.images.len(),
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        response
            .text()
            .map(str::to_string)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: String) -> LlmClient {
        let mut config = Config::for_tests();
        config.llm_api_url = url;
        LlmClient::new(&config).unwrap()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_text_only_request_serializes_content_as_string() {
        let request = CompletionRequest::text("system", "hello");
        let body = serde_json::to_value(build_request_body("m", 10, &request)).unwrap();
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["system"], "system");
        assert_eq!(body["max_tokens"], 10);
    }

    #[test]
    fn test_image_request_puts_images_before_text() {
        let image = InlineImage::from_bytes(b"png-bytes", "image/png");
        let request = CompletionRequest::with_images("system", "read this", vec![image]);
        let body = serde_json::to_value(build_request_body("m", 10, &request)).unwrap();
        let blocks = body["messages"][0]["content"].as_array().unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "image");
        assert_eq!(blocks[0]["source"]["type"], "base64");
        assert_eq!(blocks[0]["source"]["media_type"], "image/png");
        assert_eq!(
            STANDARD
                .decode(blocks[0]["source"]["data"].as_str().unwrap())
                .unwrap(),
            b"png-bytes"
        );
        assert_eq!(blocks[1]["type"], "text");
        assert_eq!(blocks[1]["text"], "read this");
    }

    #[tokio::test]
    async fn test_complete_returns_first_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"content":[{"type":"text","text":"Strengths: steady"}],
                    "usage":{"input_tokens":12,"output_tokens":4}}"#,
            )
            .create_async()
            .await;

        let client = client_for(format!("{}/v1/messages", server.url()));
        let text = client
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap();

        assert_eq!(text, "Strengths: steady");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body(r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(format!("{}/v1/messages", server.url()));
        let err = client
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 529);
                assert_eq!(message, "Overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_text_block_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"   "}]}"#)
            .create_async()
            .await;

        let client = client_for(format!("{}/v1/messages", server.url()));
        let err = client
            .complete(&CompletionRequest::text("s", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
