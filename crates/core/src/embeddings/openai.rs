use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cognee_common::config::EmbeddingConfig;

use super::{embed_with_bisection, EmbeddingEngine, EmbeddingError};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Hosted cosine-similarity embedding API (OpenAI `/v1/embeddings`-compatible).
pub struct OpenAiEmbeddingEngine {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl OpenAiEmbeddingEngine {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: u32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
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

async fn call_once(
    http: &reqwest::Client,
    api_key: &str,
    model: &str,
    dimensions: u32,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let request = EmbeddingRequest {
        model,
        input: texts,
        dimensions,
    };

    let response = http
        .post(OPENAI_EMBEDDINGS_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<OpenAiError>(&body);
        let message = parsed.as_ref().map(|e| e.error.message.clone()).unwrap_or(body);

        let is_context_window = parsed
            .map(|e| e.error.code.as_deref() == Some("context_length_exceeded"))
            .unwrap_or(false)
            || message.contains("maximum context length");

        if is_context_window {
            return Err(EmbeddingError::ContextWindowExceeded(message));
        }
        return Err(EmbeddingError::Provider(format!("{status}: {message}")));
    }

    let body: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| EmbeddingError::Provider(format!("failed to parse response: {e}")))?;

    let mut sorted = body.data;
    sorted.sort_by_key(|d| d.index);

    for item in &sorted {
        if item.embedding.len() != dimensions as usize {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimensions,
                got: item.embedding.len(),
            });
        }
    }

    Ok(sorted.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingEngine for OpenAiEmbeddingEngine {
    fn get_vector_size(&self) -> u32 {
        self.config.dimensions
    }

    async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self.config.api_key.clone().unwrap_or_default();
        let model = self.config.model.clone();
        let dimensions = self.config.dimensions;
        let retry_config = cognee_common::config::retry_config();

        embed_with_bisection(&retry_config, texts, &move |batch: Vec<String>| {
            let http = self.http.clone();
            let api_key = api_key.clone();
            let model = model.clone();
            async move { call_once(&http, &api_key, &model, dimensions, &batch).await }
        })
        .await
    }
}
