//! Layered configuration, loaded from the environment (with `.env` support).
//!
//! Each config struct exposes `from_env()` and `to_dict()` for diagnostics.
//! Process-wide singletons are memoized in [`once_cell::sync::OnceCell`]s and
//! can be reset in tests via [`reset_all`], since module-load-time
//! initialization would make singleton state leak across test cases.

use std::sync::Mutex;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_var(name) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        None => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    env_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Load a `.env` file if present. Safe to call more than once; errors (file
/// absent) are intentionally swallowed — `.env` is an optional convenience.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Rate limiter configuration shared by the LLM and embedding domains.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_limit: u32,
    pub interval_seconds: u64,
}

impl RateLimitConfig {
    pub fn from_env(prefix: &str) -> Self {
        Self {
            enabled: env_bool(&format!("{prefix}_RATE_LIMIT_ENABLED"), false),
            requests_limit: env_u32(&format!("{prefix}_RATE_LIMIT_REQUESTS"), 60),
            interval_seconds: env_u64(&format!("{prefix}_RATE_LIMIT_INTERVAL"), 60),
        }
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Retry/backoff configuration (C2).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_seconds: f64,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_seconds: 1.0,
            factor: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_retries: env_u32("RETRY_MAX_RETRIES", default.max_retries),
            base_seconds: env_f64("RETRY_BASE_SECONDS", default.base_seconds),
            factor: env_f64("RETRY_FACTOR", default.factor),
            jitter: env_f64("RETRY_JITTER", default.jitter),
        }
    }

    /// Whether retries are disabled for deterministic tests.
    pub fn retries_disabled() -> bool {
        env_bool("DISABLE_RETRIES", false)
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// LLM gateway configuration (C5).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub rate_limit: RateLimitConfig,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            provider: env_var("LLM_PROVIDER").unwrap_or_else(|| "anthropic".to_string()),
            model: env_var("LLM_MODEL").unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
            endpoint: env_var("LLM_ENDPOINT"),
            api_key: env_var("LLM_API_KEY"),
            api_version: env_var("LLM_API_VERSION"),
            rate_limit: RateLimitConfig::from_env("LLM"),
        }
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.provider,
            "model": self.model,
            "endpoint": self.endpoint,
            "api_key": self.api_key.as_ref().map(|_| "<redacted>"),
            "api_version": self.api_version,
            "rate_limit": self.rate_limit.to_dict(),
        })
    }
}

/// Embedding engine configuration (C4).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimensions: u32,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub mock: bool,
    pub rate_limit: RateLimitConfig,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            provider: env_var("EMBEDDING_PROVIDER").unwrap_or_else(|| "openai".to_string()),
            model: env_var("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimensions: env_u32("EMBEDDING_DIMENSIONS", 1536),
            endpoint: env_var("EMBEDDING_ENDPOINT"),
            api_key: env_var("EMBEDDING_API_KEY"),
            mock: env_bool("MOCK_EMBEDDING", false),
            rate_limit: RateLimitConfig::from_env("EMBEDDING"),
        }
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.provider,
            "model": self.model,
            "dimensions": self.dimensions,
            "endpoint": self.endpoint,
            "api_key": self.api_key.as_ref().map(|_| "<redacted>"),
            "mock": self.mock,
            "rate_limit": self.rate_limit.to_dict(),
        })
    }
}

/// Which cache backend to use (C7).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Fs,
}

/// Cache/lock coordinator configuration (C7).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub host: String,
    pub port: u16,
    pub caching: bool,
    pub usage_logging: bool,
    pub usage_logging_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let backend = match env_var("CACHE_BACKEND").as_deref() {
            Some("redis") => CacheBackendKind::Redis,
            _ => CacheBackendKind::Fs,
        };
        Self {
            backend,
            host: env_var("CACHE_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: env_u32("CACHE_PORT", 6379) as u16,
            caching: env_bool("CACHING", true),
            usage_logging: env_bool("USAGE_LOGGING", true),
            usage_logging_ttl_seconds: env_u64("USAGE_LOGGING_TTL", 604_800),
        }
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

struct Singletons {
    llm: OnceCell<LlmConfig>,
    embedding: OnceCell<EmbeddingConfig>,
    cache: OnceCell<CacheConfig>,
    retry: OnceCell<RetryConfig>,
}

static SINGLETONS: Mutex<Option<Singletons>> = Mutex::new(None);

fn singletons() -> std::sync::MutexGuard<'static, Option<Singletons>> {
    let mut guard = SINGLETONS.lock().unwrap();
    if guard.is_none() {
        *guard = Some(Singletons {
            llm: OnceCell::new(),
            embedding: OnceCell::new(),
            cache: OnceCell::new(),
            retry: OnceCell::new(),
        });
    }
    guard
}

/// Process-wide memoized [`LlmConfig`].
pub fn llm_config() -> LlmConfig {
    singletons()
        .as_ref()
        .unwrap()
        .llm
        .get_or_init(LlmConfig::from_env)
        .clone()
}

/// Process-wide memoized [`EmbeddingConfig`].
pub fn embedding_config() -> EmbeddingConfig {
    singletons()
        .as_ref()
        .unwrap()
        .embedding
        .get_or_init(EmbeddingConfig::from_env)
        .clone()
}

/// Process-wide memoized [`CacheConfig`].
pub fn cache_config() -> CacheConfig {
    singletons()
        .as_ref()
        .unwrap()
        .cache
        .get_or_init(CacheConfig::from_env)
        .clone()
}

/// Process-wide memoized [`RetryConfig`].
pub fn retry_config() -> RetryConfig {
    singletons()
        .as_ref()
        .unwrap()
        .retry
        .get_or_init(RetryConfig::from_env)
        .clone()
}

/// Reset all memoized configuration singletons. Tests that mutate
/// environment variables must call this before re-reading config, since
/// `OnceCell` only ever initializes once per process.
#[cfg(any(test, feature = "test-util"))]
pub fn reset_all() {
    *SINGLETONS.lock().unwrap() = None;
}
