//! Usage logger (C11): a decorator-shaped wrapper, `log_usage_around`,
//! recording a sanitized call/result snapshot of any instrumented async
//! operation. No teacher counterpart (`tvanderb-AutOSINT` has no usage-log
//! decorator) — written in the teacher's swallow-and-log-then-continue
//! idiom used throughout `crates/engine` for best-effort side channels.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use cognee_common::model::UsageLogEntry;
use cognee_common::sanitize::sanitize;
use cognee_common::SessionUsageId;

use crate::cache::CacheEngine;

/// Process metadata attached to every usage log entry.
fn process_metadata() -> Value {
    serde_json::json!({
        "crate_version": env!("CARGO_PKG_VERSION"),
        "environment": std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
    })
}

/// Wrap `fut` (the instrumented operation), append a sanitized usage log
/// entry to `cache` if configured and `usage_logging` is enabled, and
/// return `fut`'s own result unmodified. Logging failures never affect the
/// wrapped operation's outcome.
pub async fn log_usage_around<T, E, F>(
    cache: Option<&Arc<dyn CacheEngine>>,
    usage_logging_enabled: bool,
    usage_logging_ttl: Duration,
    user_id: Option<&str>,
    function_name: &str,
    parameters: Value,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Serialize,
    E: std::fmt::Display,
{
    let start = Utc::now();
    let started_at = Instant::now();

    let result = fut.await;

    let end = Utc::now();
    let duration_ms = started_at.elapsed().as_millis() as u64;

    if let (Some(cache), true) = (cache, usage_logging_enabled) {
        let (success, result_value, error) = match &result {
            Ok(value) => (true, sanitize(value, "T"), None),
            Err(e) => (false, Value::Null, Some(e.to_string())),
        };

        let entry = UsageLogEntry {
            id: SessionUsageId::new(),
            timestamp: end,
            kind: "call".to_string(),
            function_name: function_name.to_string(),
            user_id: user_id.map(str::to_string),
            parameters: sanitize(&parameters, "parameters"),
            result: result_value,
            success,
            error,
            duration_ms,
            start_time: start,
            end_time: end,
            metadata: process_metadata(),
        };

        let cache = cache.clone();
        let logged_user_id = user_id.unwrap_or("anonymous").to_string();
        if let Err(e) = cache.log_usage(&logged_user_id, entry, usage_logging_ttl).await {
            tracing::warn!(error = %e, function_name, "usage log write failed");
        }
    }

    result
}
