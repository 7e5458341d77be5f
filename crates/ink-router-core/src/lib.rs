//! # Ink Router Core
//!
//! Shared, runtime-free logic for Ink Router: data models, the injected
//! clock, the knowledge store, entity extraction, intent routing, the four
//! pipeline executors, the response cache and the rate limiter.
//!
//! This crate contains no tokio, network or filesystem-walking
//! dependencies. Everything here is either pure (router, extractor,
//! executors) or guarded by a single mutex per structure (cache, rate
//! limiter), so it can be shared across any number of concurrent requests.

pub mod cache;
pub mod clock;
pub mod entities;
pub mod knowledge;
pub mod models;
pub mod pipelines;
pub mod rate_limit;
pub mod router;

pub use cache::{CacheStats, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::{contains_term, extract};
pub use knowledge::KnowledgeStore;
pub use models::{
    ConversationTurn, EntityKind, ExecutionOptions, ExtractedEntities, PipelineCategory,
    PipelineResult, Query, QueryContext, Role,
};
pub use pipelines::{executor_for, PipelineExecutor};
pub use rate_limit::{RateDecision, RateLimiter};
pub use router::{IntentRouter, RouteScores};
