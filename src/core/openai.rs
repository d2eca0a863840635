use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::CompletionClient;
use crate::error::ApiError;
use crate::models::{GenerationRequest, OpenAiConfig};

/// Client for OpenAI-compatible chat completion APIs
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

/// Chat message for the chat completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiClient {
    /// Create a new client with the given configuration and credential
    pub fn new(config: &OpenAiConfig, api_key: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if err.is_connect() {
            ApiError::Network(format!("Could not connect to {}: {}", self.base_url, err))
        } else {
            ApiError::from(err)
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ApiError> {
        let url = self.endpoint();
        let body = build_chat_request(request);

        debug!(
            "Sending chat request to {} (model: {}, {} prompt bytes, {} content bytes)",
            url,
            request.params.model,
            request.prompt.len(),
            request.content.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        parse_completion(&text)
    }
}

fn build_chat_request(request: &GenerationRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.params.model,
        messages: vec![
            ChatMessage::system(request.prompt.as_ref()),
            ChatMessage::user(request.content.as_str()),
        ],
        temperature: request.params.temperature,
        max_tokens: request.params.max_tokens,
    }
}

/// Extract the first choice's text from a successful response body
fn parse_completion(body: &str) -> Result<String, ApiError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        ApiError::MalformedResponse(format!("{} - {}", truncate(body, 200), e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ApiError::MalformedResponse("response has no message content".to_string()))
}

/// Human-readable message from an error response body
fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        truncate(trimmed, 200).to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationParams;
    use std::sync::Arc;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            Arc::from("Summarize:"),
            "hello".to_string(),
            GenerationParams {
                model: "gpt-4".to_string(),
                temperature: 0.5,
                max_tokens: 100,
            },
        )
    }

    #[test]
    fn test_chat_message_constructors() {
        let sys = ChatMessage::system("You are helpful");
        assert_eq!(sys.role, "system");
        assert_eq!(sys.content, "You are helpful");

        let user = ChatMessage::user("Hello");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "Hello");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = request();
        let json = serde_json::to_value(build_chat_request(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "Summarize:");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Hi there \n"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hi there");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let result = parse_completion(r#"{"choices":[]}"#);
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));

        let result = parse_completion(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#);
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_completion_invalid_json() {
        let result = parse_completion("<html>bad gateway</html>");
        assert!(matches!(result, Err(ApiError::MalformedResponse(m)) if m.contains("bad gateway")));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("upstream down"), "upstream down");
        assert_eq!(error_message("  "), "empty response body");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = OpenAiConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        let client = OpenAiClient::new(&config, "key").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
