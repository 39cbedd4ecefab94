//! LLM gateway (C5): structured-output generation with response-schema
//! validation, rate-limited and retried the same way as the embedding
//! engine (C4). Polymorphic over providers (`AnthropicProvider`,
//! `OpenAiProvider`), each schema-enforced natively where the API allows
//! it; the gateway then re-validates the parsed JSON against the caller's
//! type with `jsonschema`, since a provider's native enforcement is a
//! best-effort hint, not a guarantee.

pub mod provider;
pub mod schema;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use cognee_common::config::LlmConfig;

pub use provider::{AnthropicProvider, LlmGatewayError, LlmProvider, OpenAiProvider};
pub use schema::{JsonSchemaKind, ResponseSchema, ResponseSchemaKind};

use crate::rate_limit::llm_rate_limiter;
use crate::retry::{is_rate_limit_error, retry_with_backoff};

/// Entry point for schema-constrained completion, wrapping whichever
/// provider the configuration selects.
pub struct LlmGateway {
    provider: Box<dyn LlmProvider>,
    provider_name: String,
    model: String,
}

impl LlmGateway {
    pub fn new(config: LlmConfig) -> Self {
        let provider_name = config.provider.clone();
        let model = config.model.clone();
        let provider = build_provider(&config);
        Self {
            provider,
            provider_name,
            model,
        }
    }

    /// Build a gateway around an explicit provider, bypassing env-driven
    /// selection. Used by the retriever test suite to stand in a fake
    /// provider instead of making network calls.
    #[cfg(any(test, feature = "test-util"))]
    pub fn from_provider(provider: Box<dyn LlmProvider>, provider_name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            model: model.into(),
        }
    }

    /// Generate a `T` from `text_input`, guided by `system_prompt`.
    /// Rate-limited, retried on classified rate-limit errors, and
    /// validated against `T`'s derived schema before being returned.
    pub async fn acreate_structured_output<T>(
        &self,
        text_input: &str,
        system_prompt: &str,
    ) -> Result<T, LlmGatewayError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let span = tracing::info_span!(
            "generation",
            provider = %self.provider_name,
            model = %self.model,
        );

        async move {
            let schema = ResponseSchema::for_type::<T>();

            llm_rate_limiter().async_wait_if_needed().await;

            let retry_config = cognee_common::config::retry_config();
            let value = retry_with_backoff(
                &retry_config,
                |e: &LlmGatewayError| {
                    matches!(e, LlmGatewayError::Provider(msg) if is_rate_limit_error(msg))
                },
                || self.provider.complete_structured(text_input, system_prompt, &schema),
            )
            .await?;

            schema
                .validate(&value)
                .map_err(LlmGatewayError::SchemaValidationError)?;

            serde_json::from_value(value)
                .map_err(|e| LlmGatewayError::SchemaValidationError(e.to_string()))
        }
        .instrument(span)
        .await
    }
}

fn build_provider(config: &LlmConfig) -> Box<dyn LlmProvider> {
    match config.provider.as_str() {
        "anthropic" => Box::new(AnthropicProvider::new(config.clone())),
        "openai" => Box::new(OpenAiProvider::new(config.clone())),
        other => {
            tracing::warn!(provider = other, "unknown LLM provider, defaulting to anthropic");
            Box::new(AnthropicProvider::new(config.clone()))
        }
    }
}

/// Format a user query and its system prompt together, for logging or
/// dry-run display. Mirrors the structured-output call's own message
/// framing so the two never drift apart.
pub fn show_prompt(text_input: &str, system_prompt: &str) -> Result<String, LlmGatewayError> {
    let text_input = if text_input.is_empty() {
        "No user input provided."
    } else {
        text_input
    };

    if system_prompt.is_empty() {
        return Err(LlmGatewayError::MissingSystemPrompt);
    }

    Ok(format!("System Prompt:\n{system_prompt}\n\nUser Input:\n{text_input}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_prompt_substitutes_placeholder_for_empty_input() {
        let formatted = show_prompt("", "be concise").unwrap();
        assert!(formatted.contains("No user input provided."));
        assert!(formatted.contains("be concise"));
    }

    #[test]
    fn show_prompt_rejects_missing_system_prompt() {
        let err = show_prompt("hello", "").unwrap_err();
        assert!(matches!(err, LlmGatewayError::MissingSystemPrompt));
    }
}
