//! # Ink Router
//!
//! Query routing and response caching for a tattoo studio assistant.
//!
//! An incoming natural-language question is rate limited per pipeline and
//! client, looked up in a bounded TTL cache, routed to one of four answer
//! domains by keyword scoring and answered from a static studio knowledge
//! store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ RateLimiter │──▶│ResponseCache│──▶│ IntentRouter  │──▶│ResponseEngine│
//! │ fixed window│   │ FIFO + TTL  │   │ keyword score │   │ local/remote │
//! └─────────────┘   └─────────────┘   └───────────────┘   └──────┬───────┘
//!                                                                │
//!                                              ┌─────────────────┤
//!                                              ▼                 ▼
//!                                       ┌────────────┐   ┌──────────────┐
//!                                       │ Executors  │──▶│KnowledgeStore│
//!                                       │ ×4 domains │   │  (read-only) │
//!                                       └────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ink ask "what is traditional tattoo style?"
//! ink ask "how much is a half sleeve?" --pipeline sales_assistant --json
//! ink route "I want to book an appointment"
//! ink pipelines
//! ink chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`knowledge`] | Knowledge file loading |
//! | [`engine`] | Response engine capability (local executors, remote HTTP) |
//! | [`dispatcher`] | The request pipeline |
//! | [`analytics`] | Fire-and-forget analytics sinks |
//! | [`cleanup`] | Periodic cache and rate-window sweep |
//! | [`error`] | Dispatch failure taxonomy |
//! | [`ask`] | `ask`, `route` and `chat` commands |
//! | [`pipelines`] | `pipelines` command |
//!
//! Pure logic (models, router, executors, cache, rate limiter) lives in
//! the `ink-router-core` crate, re-exported as [`ink_router_core`].

pub mod analytics;
pub mod ask;
pub mod cleanup;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod pipelines;

pub use ink_router_core;
