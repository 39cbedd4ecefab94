//! Provider adapters for schema-constrained completion. Each adapter
//! renders the call its API natively supports for enforcing structure
//! (OpenAI's `response_format: json_schema`, Anthropic's forced tool use)
//! and returns the raw JSON payload — schema *validation* against the
//! caller's type happens one layer up, in [`super::LlmGateway`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cognee_common::config::LlmConfig;

use super::schema::ResponseSchema;

/// Errors from a single provider round trip.
#[derive(Debug, thiserror::Error, Clone)]
pub enum LlmGatewayError {
    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("LLM context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("LLM response failed schema validation: {0}")]
    SchemaValidationError(String),

    #[error("no system prompt provided")]
    MissingSystemPrompt,
}

impl From<LlmGatewayError> for cognee_common::CogneeError {
    fn from(e: LlmGatewayError) -> Self {
        match e {
            LlmGatewayError::ContextWindowExceeded(msg) => {
                cognee_common::CogneeError::ContextWindowExceeded(msg)
            }
            LlmGatewayError::SchemaValidationError(msg) => {
                cognee_common::CogneeError::SchemaValidationError(msg)
            }
            LlmGatewayError::MissingSystemPrompt => {
                cognee_common::CogneeError::MissingSystemPromptPathError(
                    "no system prompt provided".to_string(),
                )
            }
            LlmGatewayError::Provider(msg) => cognee_common::CogneeError::InvalidValueError(msg),
        }
    }
}

/// One schema-constrained completion call against a concrete provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete_structured(
        &self,
        text_input: &str,
        system_prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, LlmGatewayError>;
}

fn user_content(text_input: &str) -> String {
    format!("Use the given format to extract information from the following input: {text_input}.")
}

/// OpenAI-compatible Chat Completions API, schema-enforced via
/// `response_format: {"type": "json_schema"}`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        self.config
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete_structured(
        &self,
        text_input: &str,
        system_prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, LlmGatewayError> {
        if system_prompt.is_empty() {
            return Err(LlmGatewayError::MissingSystemPrompt);
        }

        let user_message = user_content(text_input);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "response",
                    strict: true,
                    schema: schema.document(),
                },
            },
        };

        let api_key = self.config.api_key.clone().unwrap_or_default();
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmGatewayError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<OpenAiError>(&body);
            let message = parsed
                .as_ref()
                .map(|e| e.error.message.clone())
                .unwrap_or_else(|_| body.clone());

            let is_context_window = parsed
                .map(|e| e.error.code.as_deref() == Some("context_length_exceeded"))
                .unwrap_or(false)
                || message.to_lowercase().contains("maximum context length");

            if is_context_window {
                return Err(LlmGatewayError::ContextWindowExceeded(message));
            }
            return Err(LlmGatewayError::Provider(format!("{status}: {message}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmGatewayError::Provider(format!("failed to parse response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmGatewayError::Provider("no choices in response".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| LlmGatewayError::Provider(format!("non-JSON completion: {e}")))
    }
}

/// Anthropic Messages API, schema-enforced via a single forced tool call.
pub struct AnthropicProvider {
    http: reqwest::Client,
    config: LlmConfig,
}

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

impl AnthropicProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    tools: Vec<AnthropicTool<'a>>,
    tool_choice: ToolChoice<'a>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    ToolUse { input: Value },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete_structured(
        &self,
        text_input: &str,
        system_prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, LlmGatewayError> {
        if system_prompt.is_empty() {
            return Err(LlmGatewayError::MissingSystemPrompt);
        }

        let user_message = user_content(text_input);
        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &user_message,
            }],
            tools: vec![AnthropicTool {
                name: "extract",
                input_schema: schema.document(),
            }],
            tool_choice: ToolChoice {
                kind: "tool",
                name: "extract",
            },
        };

        let api_key = self.config.api_key.clone().unwrap_or_default();
        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmGatewayError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<AnthropicError>(&body);
            let message = parsed
                .as_ref()
                .map(|e| e.error.message.clone())
                .unwrap_or_else(|_| body.clone());

            let is_context_window = parsed
                .map(|e| e.error.kind == "invalid_request_error" && message.contains("too long"))
                .unwrap_or(false)
                || message.to_lowercase().contains("prompt is too long");

            if is_context_window {
                return Err(LlmGatewayError::ContextWindowExceeded(message));
            }
            return Err(LlmGatewayError::Provider(format!("{status}: {message}")));
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmGatewayError::Provider(format!("failed to parse response: {e}")))?;

        body.content
            .into_iter()
            .find_map(|block| match block {
                AnthropicContentBlock::ToolUse { input } => Some(input),
                AnthropicContentBlock::Other => None,
            })
            .ok_or_else(|| LlmGatewayError::Provider("no tool_use block in response".to_string()))
    }
}
