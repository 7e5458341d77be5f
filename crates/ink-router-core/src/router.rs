//! Keyword-scored intent routing.
//!
//! # Scoring Algorithm
//!
//! 1. Lowercase and trim the query.
//! 2. For each category, count the keywords from its set that occur in the
//!    query as whole words (each keyword counts at most once). A keyword
//!    ending in `*` is a stem and matches any word it starts, so `heal*`
//!    covers "healing". Plain keywords accept a trailing plural `s`.
//! 3. Select the category with the strictly highest score.
//! 4. If the best score is zero, or two or more categories tie for it,
//!    select [`PipelineCategory::Conversation`].
//!
//! The knowledge set includes every style term the entity extractor knows,
//! so a question naming any supported style reaches the knowledge
//! executor. Body parts are not scored: they appear just as often in
//! quotes and bookings.
//!
//! Routing is pure: the same text always selects the same category, which
//! keeps cache keys stable.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::entities::{contains_term, STYLE_TERMS};
use crate::models::{PipelineCategory, QueryContext};

/// Knowledge keywords in addition to [`STYLE_TERMS`].
const KNOWLEDGE_KEYWORDS: &[&str] = &[
    "style",
    "placement",
    "aftercare",
    "after care",
    "care for",
    "look after",
    "heal*",
    "wash*",
    "itch*",
    "peel*",
    "scab*",
    "infect*",
    "swell*",
    "swim*",
    "moisturi*",
    "doctor",
    "hurt*",
    "pain",
    "painful",
    "sore",
    "design",
    "meaning",
    "history",
    "fade*",
    "touch up",
    "touch-up",
    "how long",
    "session*",
];

const SERVICE_OPS_KEYWORDS: &[&str] = &[
    "book*",
    "appointment",
    "schedule",
    "reschedule",
    "cancel*",
    "availab*",
    "hours",
    "open*",
    "deposit",
    "consult*",
    "walk-in",
    "walk in",
    "walkin",
    "artist",
    "portfolio",
    "specialis*",
    "specializ*",
    "location",
];

const SALES_KEYWORDS: &[&str] = &[
    "price",
    "pricing",
    "cost",
    "how much",
    "quote",
    "discount",
    "deal",
    "promo*",
    "offer",
    "gift",
    "gift card",
    "voucher",
    "package",
    "prepaid",
    "plan",
    "membership",
    "subscription",
    "afford*",
    "expensive",
    "cheap*",
    "budget",
];

const CONVERSATION_KEYWORDS: &[&str] = &[
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "thank*",
    "how are you",
    "who are you",
    "what are you",
    "help",
    "bye",
];

/// Per-category scores, exposed for `ink route` diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteScores {
    pub scores: BTreeMap<PipelineCategory, usize>,
    pub selected: PipelineCategory,
}

/// Scores query text against fixed per-category keyword sets.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    keywords: BTreeMap<PipelineCategory, Vec<String>>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        let knowledge: Vec<String> = KNOWLEDGE_KEYWORDS
            .iter()
            .chain(STYLE_TERMS)
            .map(|w| w.to_string())
            .collect();
        Self {
            keywords: BTreeMap::from([
                (PipelineCategory::Knowledge, knowledge),
                (PipelineCategory::ServiceOps, owned(SERVICE_OPS_KEYWORDS)),
                (PipelineCategory::Sales, owned(SALES_KEYWORDS)),
                (PipelineCategory::Conversation, owned(CONVERSATION_KEYWORDS)),
            ]),
        }
    }
}

impl IntentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the keyword set for one category. Keywords are lowercased
    /// and may end in `*` to match as a stem.
    pub fn with_keywords(mut self, category: PipelineCategory, words: &[&str]) -> Self {
        self.keywords.insert(
            category,
            words.iter().map(|w| w.trim().to_lowercase()).collect(),
        );
        self
    }

    /// Score `query` against every category.
    pub fn score(&self, query: &str) -> BTreeMap<PipelineCategory, usize> {
        let text = query.trim().to_lowercase();
        PipelineCategory::ALL
            .iter()
            .map(|cat| {
                let hits = self
                    .keywords
                    .get(cat)
                    .map(|words| {
                        words
                            .iter()
                            .filter(|w| contains_term(&text, w))
                            .count()
                    })
                    .unwrap_or(0);
                (*cat, hits)
            })
            .collect()
    }

    /// Pick the category for `query`.
    ///
    /// The context is accepted so callers can pass the whole request, but
    /// routing scores the text alone; history only shapes the answer.
    pub fn select(&self, query: &str, _context: &QueryContext) -> PipelineCategory {
        self.explain(query).selected
    }

    /// Scores plus the selected category.
    pub fn explain(&self, query: &str) -> RouteScores {
        let scores = self.score(query);
        let best = scores.values().copied().max().unwrap_or(0);
        let leaders: Vec<PipelineCategory> = scores
            .iter()
            .filter(|(_, s)| **s == best)
            .map(|(c, _)| *c)
            .collect();

        let selected = match leaders.as_slice() {
            [only] if best > 0 => *only,
            _ => PipelineCategory::Conversation,
        };

        tracing::debug!(?scores, %selected, "routed query");
        RouteScores { scores, selected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(router: &IntentRouter, query: &str) -> PipelineCategory {
        router.select(query, &QueryContext::default())
    }

    #[test]
    fn test_style_question_routes_to_knowledge() {
        let router = IntentRouter::new();
        assert_eq!(
            select(&router, "what is traditional tattoo style?"),
            PipelineCategory::Knowledge
        );
    }

    #[test]
    fn test_booking_routes_to_service_ops() {
        let router = IntentRouter::new();
        assert_eq!(
            select(&router, "I want to book an appointment"),
            PipelineCategory::ServiceOps
        );
    }

    #[test]
    fn test_price_routes_to_sales() {
        let router = IntentRouter::new();
        assert_eq!(
            select(&router, "How much does a gift card cost?"),
            PipelineCategory::Sales
        );
    }

    #[test]
    fn test_zero_score_falls_back_to_conversation() {
        let router = IntentRouter::new();
        assert_eq!(select(&router, ""), PipelineCategory::Conversation);
        assert_eq!(select(&router, "   "), PipelineCategory::Conversation);
        assert_eq!(select(&router, "zzz qqq"), PipelineCategory::Conversation);
    }

    #[test]
    fn test_tie_falls_back_to_conversation() {
        let router = IntentRouter::new();
        // One knowledge keyword ("watercolor") and one service keyword ("book").
        let scores = router.score("book a watercolor");
        assert_eq!(scores[&PipelineCategory::Knowledge], 1);
        assert_eq!(scores[&PipelineCategory::ServiceOps], 1);
        assert_eq!(
            select(&router, "book a watercolor"),
            PipelineCategory::Conversation
        );
    }

    #[test]
    fn test_tie_is_not_resolved_by_iteration_order() {
        // Knowledge comes first in ALL; a tie must still not pick it.
        let router = IntentRouter::new()
            .with_keywords(PipelineCategory::Knowledge, &["alpha"])
            .with_keywords(PipelineCategory::Sales, &["beta"]);
        assert_eq!(select(&router, "alpha beta"), PipelineCategory::Conversation);
        assert_eq!(select(&router, "alpha"), PipelineCategory::Knowledge);
    }

    #[test]
    fn test_conversation_can_win_outright() {
        let router = IntentRouter::new();
        assert_eq!(select(&router, "hello there"), PipelineCategory::Conversation);
    }

    #[test]
    fn test_select_is_deterministic() {
        let router = IntentRouter::new();
        let q = "Does a rib placement hurt more than the forearm?";
        let first = router.explain(q);
        for _ in 0..10 {
            assert_eq!(router.explain(q), first);
        }
        assert_eq!(first.selected, PipelineCategory::Knowledge);
    }

    #[test]
    fn test_style_vocabulary_routes_to_knowledge() {
        let router = IntentRouter::new();
        for q in [
            "What is dotwork?",
            "Tell me about irezumi",
            "do you do mandala pieces",
            "polynesian patterns",
            "a portrait of my dog",
        ] {
            assert_eq!(select(&router, q), PipelineCategory::Knowledge, "{}", q);
        }
    }

    #[test]
    fn test_aftercare_questions_route_to_knowledge() {
        let router = IntentRouter::new();
        for q in [
            "How do I care for a new tattoo?",
            "Is it normal for my tattoo to peel?",
            "it's really itchy",
            "When can I go swimming again?",
        ] {
            assert_eq!(select(&router, q), PipelineCategory::Knowledge, "{}", q);
        }
    }

    #[test]
    fn test_who_are_you_is_not_a_prefix_of_your() {
        let router = IntentRouter::new();
        let scores = router.score("Who are your artists?");
        assert_eq!(scores[&PipelineCategory::Conversation], 0);
        assert_eq!(select(&router, "Who are your artists?"), PipelineCategory::ServiceOps);
        assert_eq!(select(&router, "who are you?"), PipelineCategory::Conversation);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let router = IntentRouter::new();
        // "pain" inside "painting" and "deal" inside "ideal" do not count.
        let scores = router.score("an ideal painting");
        assert_eq!(scores[&PipelineCategory::Knowledge], 0);
        assert_eq!(scores[&PipelineCategory::Sales], 0);
    }

    #[test]
    fn test_context_does_not_change_routing() {
        let router = IntentRouter::new();
        let with_history = QueryContext {
            history: vec![crate::models::ConversationTurn {
                role: crate::models::Role::User,
                content: "hello".to_string(),
            }],
            mobile: true,
        };
        let q = "how much is a half sleeve?";
        assert_eq!(router.select(q, &with_history), select(&router, q));
    }
}
