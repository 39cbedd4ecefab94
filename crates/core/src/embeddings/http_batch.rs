use async_trait::async_trait;

use cognee_common::config::EmbeddingConfig;

use super::{embed_with_bisection, EmbeddingEngine, EmbeddingError};

/// Fixed sub-batch size used when talking to a remote HTTP embedding
/// endpoint that doesn't itself cap request size — keeps individual
/// requests small before bisection ever has to kick in on overflow.
const BATCH_SIZE: usize = 64;

/// Remote HTTP embedding endpoint, batched client-side in chunks of
/// [`BATCH_SIZE`] before being handed to the shared bisection/retry path.
pub struct HttpBatchEmbeddingEngine {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpBatchEmbeddingEngine {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(serde::Serialize)]
struct BatchRequest<'a> {
    inputs: &'a [String],
}

#[derive(serde::Deserialize)]
struct BatchResponse {
    vectors: Vec<Vec<f32>>,
}

async fn call_once(
    http: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    dimensions: u32,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut request = http.post(endpoint).json(&BatchRequest { inputs: texts });
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

    if response.status() == reqwest::StatusCode::PAYLOAD_TOO_LARGE {
        let body = response.text().await.unwrap_or_default();
        return Err(EmbeddingError::ContextWindowExceeded(body));
    }

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EmbeddingError::Provider(body));
    }

    let body: BatchResponse = response
        .json()
        .await
        .map_err(|e| EmbeddingError::Provider(format!("failed to parse response: {e}")))?;

    for vec in &body.vectors {
        if vec.len() != dimensions as usize {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimensions,
                got: vec.len(),
            });
        }
    }

    Ok(body.vectors)
}

#[async_trait]
impl EmbeddingEngine for HttpBatchEmbeddingEngine {
    fn get_vector_size(&self) -> u32 {
        self.config.dimensions
    }

    async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let endpoint = self
            .config
            .endpoint
            .clone()
            .ok_or_else(|| EmbeddingError::Provider("no embedding endpoint configured".into()))?;
        let api_key = self.config.api_key.clone();
        let dimensions = self.config.dimensions;
        let retry_config = cognee_common::config::retry_config();

        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let chunk = chunk.to_vec();
            let vectors = embed_with_bisection(&retry_config, &chunk, &move |batch: Vec<String>| {
                let http = self.http.clone();
                let endpoint = endpoint.clone();
                let api_key = api_key.clone();
                async move { call_once(&http, &endpoint, api_key.as_deref(), dimensions, &batch).await }
            })
            .await?;
            all.extend(vectors);
        }

        Ok(all)
    }
}
