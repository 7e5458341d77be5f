//! Core data models shared by the router, the executors and the dispatcher.
//!
//! These types describe a query as it enters the engine, the entities
//! extracted from it, the pipeline category it is routed to and the result
//! a pipeline produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The four fixed response domains. Exactly one is selected per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineCategory {
    /// Style, placement, aftercare and pricing knowledge.
    Knowledge,
    /// Booking, hours, deposits and other studio operations.
    ServiceOps,
    /// Packages, promotions, gift cards and quotes.
    Sales,
    /// Greetings, small talk and the general fallback.
    Conversation,
}

impl PipelineCategory {
    /// All categories in scoring order.
    pub const ALL: [PipelineCategory; 4] = [
        PipelineCategory::Knowledge,
        PipelineCategory::ServiceOps,
        PipelineCategory::Sales,
        PipelineCategory::Conversation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineCategory::Knowledge => "knowledge",
            PipelineCategory::ServiceOps => "service_ops",
            PipelineCategory::Sales => "sales",
            PipelineCategory::Conversation => "conversation",
        }
    }
}

impl fmt::Display for PipelineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "knowledge" => Ok(PipelineCategory::Knowledge),
            "service_ops" | "serviceops" => Ok(PipelineCategory::ServiceOps),
            "sales" => Ok(PipelineCategory::Sales),
            "conversation" => Ok(PipelineCategory::Conversation),
            other => anyhow::bail!(
                "Unknown pipeline category: '{}'. Must be knowledge, service_ops, sales, or conversation.",
                other
            ),
        }
    }
}

/// The closed set of entity kinds the extractor may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Style,
    BodyPart,
    Size,
    Color,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Style => "style",
            EntityKind::BodyPart => "body_part",
            EntityKind::Size => "size",
            EntityKind::Color => "color",
        }
    }
}

/// Entities extracted from a query, keyed by [`EntityKind`].
///
/// Keys can only come from the closed enumeration. A kind is absent
/// (rather than mapped to an empty list) when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedEntities(BTreeMap<EntityKind, Vec<String>>);

impl ExtractedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value for `kind`, ignoring exact duplicates.
    pub fn push(&mut self, kind: EntityKind, value: impl Into<String>) {
        let value = value.into();
        let values = self.0.entry(kind).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// All values for `kind`, in match order.
    pub fn get(&self, kind: EntityKind) -> &[String] {
        self.0.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value for `kind`, if any.
    pub fn first(&self, kind: EntityKind) -> Option<&str> {
        self.get(kind).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKind, &Vec<String>)> {
        self.0.iter()
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Caller-supplied context accompanying a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Tight display context; caps suggestions at the pipeline's mobile limit.
    #[serde(default)]
    pub mobile: bool,
}

impl QueryContext {
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }
}

/// An incoming request: text, context and the opaque client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub context: QueryContext,
    pub client_id: String,
}

impl Query {
    pub fn new(text: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: QueryContext::default(),
            client_id: client_id.into(),
        }
    }

    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = context;
        self
    }
}

/// The answer a pipeline produced for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub answer: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Knowledge-store topic keys the answer was composed from.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Suggested follow-up queries, already truncated to the caller's cap.
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub category: PipelineCategory,
    /// Local processing time, stamped by the dispatcher.
    #[serde(default)]
    pub processing_ms: u64,
}

/// Per-request execution knobs derived from the pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub max_suggestions: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self { max_suggestions: 4 }
    }
}
