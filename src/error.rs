//! Dispatch failure taxonomy.
//!
//! | Variant | Code | Retry |
//! |---------|------|-------|
//! | [`DispatchError::PipelineNotFound`] | `pipeline_not_found` | never |
//! | [`DispatchError::RateLimited`] | `rate_limited` | caller may retry after `reset_at_ms` |
//! | [`DispatchError::ExecutionFault`] | `execution_fault` | caller decides |
//!
//! These are values carried inside a `DispatchResult`, never propagated as
//! `Err` across `RequestDispatcher::process`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchError {
    #[error("pipeline '{pipeline}' not found")]
    PipelineNotFound { pipeline: String },

    #[error("rate limit exceeded for pipeline '{pipeline}'; window resets at {reset_at_ms}")]
    RateLimited { pipeline: String, reset_at_ms: u64 },

    #[error("pipeline execution failed: {message}")]
    ExecutionFault { message: String },
}

impl DispatchError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::PipelineNotFound { .. } => "pipeline_not_found",
            DispatchError::RateLimited { .. } => "rate_limited",
            DispatchError::ExecutionFault { .. } => "execution_fault",
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::PipelineNotFound { .. })
    }
}
