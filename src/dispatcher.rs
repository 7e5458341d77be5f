//! Request dispatch.
//!
//! [`RequestDispatcher::process`] is the single request entry point:
//!
//! ```text
//! pipeline lookup ─▶ RateLimiter.allow ─▶ ResponseCache.get ──hit──▶ result
//!                                              │ miss
//!                                              ▼
//!                        IntentRouter.select (unless the pipeline pins a category)
//!                                              ▼
//!                                   ResponseEngine.respond
//!                                              ▼
//!                                   ResponseCache.put ─▶ result
//! ```
//!
//! Every call returns a [`DispatchResult`]. Unknown pipelines, refused rate
//! checks and engine failures (including panics) become a [`DispatchError`]
//! inside the result; nothing propagates to the caller.
//!
//! An unknown pipeline touches neither the limiter nor the cache. A refused
//! rate check does no routing, execution or cache work.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat};
use ink_router_core::{
    extract, Clock, ExecutionOptions, IntentRouter, KnowledgeStore, PipelineCategory,
    PipelineResult, Query, QueryContext, RateLimiter, ResponseCache, RouteScores, SystemClock,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analytics::{
    AnalyticsEvent, AnalyticsSink, NoopSink, TracingSink, QUERY_COMPLETED, QUERY_FAILED,
};
use crate::cleanup::{self, SweepReport};
use crate::config::{Config, PipelineConfig};
use crate::engine::{create_engine, EngineRequest, LocalEngine, ResponseEngine};
use crate::error::DispatchError;
use crate::knowledge::load_knowledge;

/// Timing and outcome details attached to every result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchMetadata {
    pub request_id: String,
    pub pipeline: String,
    /// The category that answered; `None` when no routing happened.
    pub category: Option<PipelineCategory>,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
    /// Request start, ms since the Unix epoch.
    pub timestamp_ms: u64,
    /// Request start, RFC 3339.
    pub timestamp: String,
    /// Requests left in the rate window; `None` if the limiter was not consulted.
    pub rate_limit_remaining: Option<u32>,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    pub result: Option<PipelineResult>,
    pub error: Option<DispatchError>,
    pub metadata: DispatchMetadata,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Cache introspection for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheReport {
    pub size: usize,
    pub max_size: usize,
    pub average_hit_rate: f64,
    /// Live keys, oldest first.
    pub keys: Vec<String>,
}

/// Orchestrates rate limiting, caching, routing and execution.
pub struct RequestDispatcher {
    pipelines: BTreeMap<String, PipelineConfig>,
    knowledge: Arc<KnowledgeStore>,
    router: IntentRouter,
    engine: Arc<dyn ResponseEngine>,
    cache: Arc<ResponseCache<PipelineResult>>,
    limiter: Arc<RateLimiter>,
    analytics: Arc<dyn AnalyticsSink>,
    clock: Arc<dyn Clock>,
}

/// Normalise query text for cache keys: lowercase, trimmed, single spaces.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"{pipeline}:{sha256-hex}"` over the normalised query and the context
/// fields that change the answer.
pub fn cache_key(pipeline: &str, text: &str, context: &QueryContext) -> String {
    debug_assert!(!pipeline.is_empty(), "pipeline id must not be empty");
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(text).as_bytes());
    hasher.update(b"\0mobile=");
    hasher.update(if context.mobile { b"1" } else { b"0" });
    hasher.update(b"\0history=");
    hasher.update(if context.has_history() { b"1" } else { b"0" });
    format!("{}:{}", pipeline, hex::encode(hasher.finalize()))
}

fn iso_timestamp(ms: u64) -> String {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

impl RequestDispatcher {
    /// Build a dispatcher with the local engine and no analytics.
    pub fn new(config: &Config, knowledge: Arc<KnowledgeStore>, clock: Arc<dyn Clock>) -> Self {
        let limiter = config.pipelines.iter().fold(
            RateLimiter::new(config.rate_window(), 100, clock.clone()),
            |limiter, (name, p)| limiter.with_pipeline_limit(name.clone(), p.rate_limit),
        );

        Self {
            pipelines: config.pipelines.clone(),
            engine: Arc::new(LocalEngine::new(knowledge.clone())),
            knowledge,
            router: IntentRouter::new(),
            cache: Arc::new(ResponseCache::new(config.cache.max_size, clock.clone())),
            limiter: Arc::new(limiter),
            analytics: Arc::new(NoopSink),
            clock,
        }
    }

    /// Build everything from configuration: knowledge file, system clock,
    /// configured engine and tracing analytics.
    pub fn from_config(config: &Config) -> Result<Self> {
        let knowledge = Arc::new(load_knowledge(config)?);
        let engine = create_engine(&config.engine, knowledge.clone())?;
        Ok(Self::new(config, knowledge, Arc::new(SystemClock))
            .with_engine(engine)
            .with_analytics(Arc::new(TracingSink)))
    }

    pub fn with_engine(mut self, engine: Arc<dyn ResponseEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_router(mut self, router: IntentRouter) -> Self {
        self.router = router;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Scores and selected category for `text`, without dispatching.
    pub fn route(&self, text: &str) -> RouteScores {
        self.router.explain(text)
    }

    /// Process one query. Never fails; errors are carried in the result.
    pub async fn process(
        &self,
        pipeline: &str,
        text: &str,
        context: &QueryContext,
        client_id: &str,
    ) -> DispatchResult {
        let started = self.clock.now_ms();
        let mut meta = DispatchMetadata {
            request_id: uuid::Uuid::new_v4().to_string(),
            pipeline: pipeline.to_string(),
            category: None,
            elapsed_ms: 0,
            cache_hit: false,
            timestamp_ms: started,
            timestamp: iso_timestamp(started),
            rate_limit_remaining: None,
        };

        let Some(config) = self.pipelines.get(pipeline) else {
            warn!(pipeline, "unknown pipeline");
            return self.fail(
                meta,
                started,
                DispatchError::PipelineNotFound {
                    pipeline: pipeline.to_string(),
                },
            );
        };

        let decision = self.limiter.allow(pipeline, client_id);
        meta.rate_limit_remaining = Some(decision.remaining);
        if !decision.allowed {
            debug!(pipeline, client = client_id, reset_at = decision.window_reset_at, "rate limited");
            return self.fail(
                meta,
                started,
                DispatchError::RateLimited {
                    pipeline: pipeline.to_string(),
                    reset_at_ms: decision.window_reset_at,
                },
            );
        }

        let key = config
            .cache_enabled
            .then(|| cache_key(pipeline, text, context));

        if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
            meta.category = Some(hit.category);
            meta.cache_hit = true;
            return self.succeed(meta, started, hit);
        }

        let category = config
            .category
            .unwrap_or_else(|| self.router.select(text, context));
        meta.category = Some(category);

        let request = EngineRequest {
            pipeline: pipeline.to_string(),
            category,
            text: text.to_string(),
            entities: extract(text),
            context: context.clone(),
            options: ExecutionOptions {
                max_suggestions: config.suggestion_cap(context.mobile),
            },
        };

        let mut result = match self.execute(request).await {
            Ok(result) => result,
            Err(message) => {
                return self.fail(meta, started, DispatchError::ExecutionFault { message });
            }
        };
        result.processing_ms = self.clock.now_ms().saturating_sub(started);

        if let Some(key) = key {
            self.cache.put(key, result.clone(), config.cache_ttl());
        }

        self.succeed(meta, started, result)
    }

    /// [`process`](Self::process) for a [`Query`].
    pub async fn process_query(&self, pipeline: &str, query: &Query) -> DispatchResult {
        self.process(pipeline, &query.text, &query.context, &query.client_id)
            .await
    }

    /// Run the engine on its own task so a panic surfaces as a fault.
    async fn execute(&self, request: EngineRequest) -> std::result::Result<PipelineResult, String> {
        let engine = self.engine.clone();
        let handle = tokio::spawn(async move { engine.respond(&request).await });
        match handle.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(join_err) if join_err.is_panic() => {
                Err(format!("{} engine panicked", self.engine.name()))
            }
            Err(join_err) => Err(join_err.to_string()),
        }
    }

    /// Hand an event to the sink. A panicking sink is logged and ignored.
    fn emit(&self, event: AnalyticsEvent) {
        let name = event.name;
        if catch_unwind(AssertUnwindSafe(|| self.analytics.emit(event))).is_err() {
            warn!(event = name, "analytics sink panicked; event dropped");
        }
    }

    fn succeed(&self, mut meta: DispatchMetadata, started: u64, result: PipelineResult) -> DispatchResult {
        meta.elapsed_ms = self.clock.now_ms().saturating_sub(started);
        debug!(
            pipeline = %meta.pipeline,
            category = ?meta.category,
            cache_hit = meta.cache_hit,
            elapsed_ms = meta.elapsed_ms,
            "query completed"
        );
        self.emit(AnalyticsEvent {
            name: QUERY_COMPLETED,
            pipeline: meta.pipeline.clone(),
            success: true,
            elapsed_ms: meta.elapsed_ms,
            cache_hit: meta.cache_hit,
            error_code: None,
        });
        DispatchResult {
            success: true,
            result: Some(result),
            error: None,
            metadata: meta,
        }
    }

    fn fail(&self, mut meta: DispatchMetadata, started: u64, error: DispatchError) -> DispatchResult {
        meta.elapsed_ms = self.clock.now_ms().saturating_sub(started);
        if let DispatchError::ExecutionFault { message } = &error {
            warn!(pipeline = %meta.pipeline, error = %message, "pipeline execution failed");
        }
        self.emit(AnalyticsEvent {
            name: QUERY_FAILED,
            pipeline: meta.pipeline.clone(),
            success: false,
            elapsed_ms: meta.elapsed_ms,
            cache_hit: false,
            error_code: Some(error.code()),
        });
        DispatchResult {
            success: false,
            result: None,
            error: Some(error),
            metadata: meta,
        }
    }

    // ============ Introspection ============

    pub fn pipeline_info(&self, pipeline: &str) -> Option<&PipelineConfig> {
        self.pipelines.get(pipeline)
    }

    /// All configured pipelines, sorted by name.
    pub fn list_pipelines(&self) -> Vec<(&str, &PipelineConfig)> {
        self.pipelines
            .iter()
            .map(|(name, config)| (name.as_str(), config))
            .collect()
    }

    pub fn cache_stats(&self) -> CacheReport {
        let stats = self.cache.stats();
        CacheReport {
            size: stats.size,
            max_size: stats.max_size,
            average_hit_rate: stats.average_hit_rate,
            keys: self.cache.keys(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of live `(pipeline, client)` rate windows.
    pub fn rate_limit_windows(&self) -> usize {
        self.limiter.tracked_windows()
    }

    /// One immediate cleanup sweep.
    pub fn sweep(&self) -> SweepReport {
        cleanup::sweep(&self.cache, &self.limiter)
    }

    /// Start the periodic cleanup task.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        cleanup::spawn_cleanup(self.cache.clone(), self.limiter.clone(), interval)
    }
}
