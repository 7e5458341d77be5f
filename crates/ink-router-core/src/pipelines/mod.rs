//! The four pipeline executors.
//!
//! Every executor follows the same shape:
//!
//! 1. Test the lowercased query against a short, ordered list of topic
//!    triggers for its domain. Triggers match whole words or phrases; a
//!    trailing `*` marks a stem.
//! 2. On the first trigger that matches, compose the answer from
//!    [`KnowledgeStore::resolve`] fragments, cite the topic keys used as
//!    sources and report a high confidence (≥ 0.8).
//! 3. Otherwise, or when a matched topic cannot be resolved, return the
//!    domain fallback with a lower confidence and no sources.
//!
//! Executors are pure and total: they never panic, never fail and always
//! produce a non-empty answer with at most `max_suggestions` follow-ups.
//!
//! | Category | Executor | Triggers (in order) |
//! |----------|----------|---------------------|
//! | `knowledge` | [`KnowledgeExecutor`] | aftercare, placement pain, style, sessions, placement, pricing, placement ranking, style list |
//! | `service_ops` | [`ServiceOpsExecutor`] | cancel/reschedule, booking, deposit, hours, consultation, walk-ins, artists |
//! | `sales` | [`SalesExecutor`] | gift cards, packages, promotions, quotes |
//! | `conversation` | [`ConversationExecutor`] | thanks, identity, help, greeting |

mod conversation;
mod knowledge;
mod sales;
mod service_ops;

pub use conversation::ConversationExecutor;
pub use knowledge::KnowledgeExecutor;
pub use sales::SalesExecutor;
pub use service_ops::ServiceOpsExecutor;

use crate::entities::{contains_term, size_bucket};
use crate::knowledge::KnowledgeStore;
use crate::models::{
    EntityKind, ExecutionOptions, ExtractedEntities, PipelineCategory, PipelineResult,
    QueryContext,
};

// ═══════════════════════════════════════════════════════════════════════
// Executor Trait
// ═══════════════════════════════════════════════════════════════════════

/// Everything an executor may look at for one query.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionInput<'a> {
    pub knowledge: &'a KnowledgeStore,
    pub text: &'a str,
    pub entities: &'a ExtractedEntities,
    pub context: &'a QueryContext,
    pub options: ExecutionOptions,
}

impl ExecutionInput<'_> {
    fn lowered(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// A domain answerer. Implementations must be pure and must not panic.
pub trait PipelineExecutor: Send + Sync {
    fn category(&self) -> PipelineCategory;

    fn run(&self, input: &ExecutionInput<'_>) -> PipelineResult;
}

/// The executor for a category.
pub fn executor_for(category: PipelineCategory) -> &'static dyn PipelineExecutor {
    match category {
        PipelineCategory::Knowledge => &KnowledgeExecutor,
        PipelineCategory::ServiceOps => &ServiceOpsExecutor,
        PipelineCategory::Sales => &SalesExecutor,
        PipelineCategory::Conversation => &ConversationExecutor,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Shared helpers
// ═══════════════════════════════════════════════════════════════════════

/// A topic key and the fragment fields to take from it.
pub(crate) type Part<'a> = (String, &'a [&'a str]);

/// True if `text` contains any of `terms` (see [`contains_term`]).
pub(crate) fn has_term(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(text, t))
}

/// True if any whitespace-separated word of `text` equals one of `words`.
pub(crate) fn has_word(text: &str, words: &[&str]) -> bool {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| words.contains(&w))
}

fn capped(suggestions: &[&str], options: ExecutionOptions) -> Vec<String> {
    suggestions
        .iter()
        .take(options.max_suggestions)
        .map(|s| s.to_string())
        .collect()
}

/// Build a high-confidence answer from knowledge fragments.
///
/// Returns `None` if any part cannot be resolved.
pub(crate) fn compose(
    category: PipelineCategory,
    input: &ExecutionInput<'_>,
    parts: &[Part<'_>],
    confidence: f64,
    suggestions: &[&str],
) -> Option<PipelineResult> {
    let texts = parts
        .iter()
        .map(|(topic, fields)| input.knowledge.resolve(topic, fields))
        .collect::<Option<Vec<String>>>()?;
    if texts.is_empty() {
        return None;
    }
    Some(PipelineResult {
        answer: texts.join(" "),
        confidence: confidence.clamp(0.0, 1.0),
        sources: parts.iter().map(|(topic, _)| topic.clone()).collect(),
        suggestions: capped(suggestions, input.options),
        category,
        processing_ms: 0,
    })
}

/// The domain fallback: no sources, moderate confidence.
pub(crate) fn fallback(
    category: PipelineCategory,
    answer: String,
    confidence: f64,
    suggestions: &[&str],
    options: ExecutionOptions,
) -> PipelineResult {
    PipelineResult {
        answer,
        confidence: confidence.clamp(0.0, 1.0),
        sources: Vec::new(),
        suggestions: capped(suggestions, options),
        category,
        processing_ms: 0,
    }
}

/// Pricing parts for the first size entity, or the general overview.
pub(crate) fn pricing_parts(entities: &ExtractedEntities) -> Vec<Part<'static>> {
    match entities.first(EntityKind::Size).and_then(size_bucket) {
        Some(bucket) => vec![
            (format!("pricing.sizes.{}", bucket), &["range", "sessions"][..]),
            ("pricing".to_string(), &["rates"][..]),
        ],
        None => vec![("pricing".to_string(), &["overview", "rates"][..])],
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::entities::extract;

    pub fn store() -> KnowledgeStore {
        KnowledgeStore::builtin().expect("builtin knowledge must load")
    }

    pub fn run_with(
        category: PipelineCategory,
        ks: &KnowledgeStore,
        text: &str,
        context: &QueryContext,
        max_suggestions: usize,
    ) -> PipelineResult {
        let entities = extract(text);
        let input = ExecutionInput {
            knowledge: ks,
            text,
            entities: &entities,
            context,
            options: ExecutionOptions { max_suggestions },
        };
        executor_for(category).run(&input)
    }

    pub fn run(category: PipelineCategory, ks: &KnowledgeStore, text: &str) -> PipelineResult {
        run_with(category, ks, text, &QueryContext::default(), 4)
    }
}
