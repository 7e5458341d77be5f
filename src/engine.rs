//! Response engine capability.
//!
//! The dispatcher never calls a pipeline executor directly. It hands an
//! [`EngineRequest`] to a [`ResponseEngine`], which lets the answering
//! backend be swapped by configuration:
//!
//! - **[`LocalEngine`]** runs the in-process pipeline executors against the
//!   loaded [`KnowledgeStore`]. No I/O.
//! - **[`RemoteEngine`]** POSTs the request as JSON to an external answering
//!   service and parses a [`PipelineResult`] back.
//!
//! # Retry Strategy
//!
//! The remote engine uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 250ms, 500ms, 1s, 2s, ... (capped at 2^5 steps)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use ink_router_core::pipelines::{executor_for, ExecutionInput};
use ink_router_core::{
    ExecutionOptions, ExtractedEntities, KnowledgeStore, PipelineCategory, PipelineResult,
    QueryContext,
};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;

/// One routed query, ready to be answered.
#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest {
    pub pipeline: String,
    pub category: PipelineCategory,
    pub text: String,
    pub entities: ExtractedEntities,
    pub context: QueryContext,
    pub options: ExecutionOptions,
}

/// Something that can answer a routed query.
#[async_trait]
pub trait ResponseEngine: Send + Sync {
    /// Short identifier, e.g. `"local"`.
    fn name(&self) -> &str;

    async fn respond(&self, request: &EngineRequest) -> Result<PipelineResult>;
}

// ============ Local Engine ============

/// Answers with the built-in pipeline executors.
pub struct LocalEngine {
    knowledge: Arc<KnowledgeStore>,
}

impl LocalEngine {
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self { knowledge }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl ResponseEngine for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn respond(&self, request: &EngineRequest) -> Result<PipelineResult> {
        let input = ExecutionInput {
            knowledge: &self.knowledge,
            text: &request.text,
            entities: &request.entities,
            context: &request.context,
            options: request.options,
        };
        let executor = executor_for(request.category);
        catch_unwind(AssertUnwindSafe(|| executor.run(&input))).map_err(|payload| {
            anyhow!(
                "{} executor panicked: {}",
                request.category,
                panic_message(payload)
            )
        })
    }
}

// ============ Remote Engine ============

/// Answers by calling an external service over HTTP.
///
/// The service receives the [`EngineRequest`] as JSON and must return an
/// object with at least a non-empty `answer` string. `confidence`,
/// `sources` and `suggestions` are optional.
pub struct RemoteEngine {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
}

impl RemoteEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let url = config
            .url
            .as_ref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("engine.url required for the remote engine"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: url.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ResponseEngine for RemoteEngine {
    fn name(&self) -> &str {
        "remote"
    }

    async fn respond(&self, request: &EngineRequest) -> Result<PipelineResult> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(250 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, "retrying remote engine");
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&self.url).json(request).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_remote_response(&json, request);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("Remote engine error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Remote engine error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Remote engine failed after retries")))
    }
}

fn string_list(json: &serde_json::Value, key: &str) -> Vec<String> {
    json.get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a remote answer, clamping confidence and capping suggestions.
pub fn parse_remote_response(
    json: &serde_json::Value,
    request: &EngineRequest,
) -> Result<PipelineResult> {
    let answer = json
        .get("answer")
        .and_then(|a| a.as_str())
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| anyhow!("Invalid remote response: missing answer"))?;

    let confidence = json
        .get("confidence")
        .and_then(|c| c.as_f64())
        .unwrap_or(0.5);

    let mut suggestions = string_list(json, "suggestions");
    suggestions.truncate(request.options.max_suggestions);

    Ok(PipelineResult {
        answer: answer.to_string(),
        confidence: if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        },
        sources: string_list(json, "sources"),
        suggestions,
        category: request.category,
        processing_ms: 0,
    })
}

/// Create the engine selected by `engine.provider`.
pub fn create_engine(
    config: &EngineConfig,
    knowledge: Arc<KnowledgeStore>,
) -> Result<Arc<dyn ResponseEngine>> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalEngine::new(knowledge))),
        "remote" => Ok(Arc::new(RemoteEngine::new(config)?)),
        other => bail!(
            "Unknown engine provider: '{}'. Must be local or remote.",
            other
        ),
    }
}
