use super::{compose, fallback, has_term, ExecutionInput, PipelineExecutor};
use crate::models::{PipelineCategory, PipelineResult};

/// (triggers, studio fields, confidence, suggestions), checked in order.
type Trigger = (
    &'static [&'static str],
    &'static [&'static str],
    f64,
    &'static [&'static str],
);

pub(super) const BOOKING_SUGGESTIONS: &[&str] = &[
    "How does the deposit work?",
    "Can I book a free consultation?",
    "What are your opening hours?",
    "Which artist should I book with?",
];
pub(super) const POLICY_SUGGESTIONS: &[&str] = &[
    "How do I reschedule my appointment?",
    "Is my deposit refundable?",
    "What are your opening hours?",
];
pub(super) const VISIT_SUGGESTIONS: &[&str] = &[
    "Do you take walk-ins?",
    "How do I book an appointment?",
    "Who are your artists?",
];

const TRIGGERS: &[Trigger] = &[
    (
        &["cancel*", "reschedul*", "move my", "change my appointment"],
        &["cancellation"],
        0.9,
        POLICY_SUGGESTIONS,
    ),
    (
        &["book*", "appointment", "schedule", "reserv*", "availab*"],
        &["booking", "deposit"],
        0.9,
        BOOKING_SUGGESTIONS,
    ),
    (
        &["deposit", "refund*"],
        &["deposit", "cancellation"],
        0.9,
        POLICY_SUGGESTIONS,
    ),
    (
        &["hours", "open*", "clos*", "when are you"],
        &["hours"],
        0.9,
        VISIT_SUGGESTIONS,
    ),
    (
        &["consult*"],
        &["consultation"],
        0.85,
        BOOKING_SUGGESTIONS,
    ),
    (
        &["walk-in", "walk in", "walkin", "drop in", "drop by"],
        &["walk_ins", "hours"],
        0.85,
        VISIT_SUGGESTIONS,
    ),
    (
        &["artist", "who tattoos", "portfolio", "specialis*", "specializ*"],
        &["artists"],
        0.85,
        BOOKING_SUGGESTIONS,
    ),
];

const FALLBACK: &str = "I can help you book an appointment, check our opening hours, explain our deposit and cancellation policy, or set up a free consultation. What do you need?";

/// Booking, hours, deposits and other studio operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOpsExecutor;

impl PipelineExecutor for ServiceOpsExecutor {
    fn category(&self) -> PipelineCategory {
        PipelineCategory::ServiceOps
    }

    fn run(&self, input: &ExecutionInput<'_>) -> PipelineResult {
        let text = input.lowered();
        let matched = TRIGGERS
            .iter()
            .find(|(words, ..)| has_term(&text, words))
            .and_then(|(_, fields, confidence, suggestions)| {
                compose(
                    PipelineCategory::ServiceOps,
                    input,
                    &[("studio".to_string(), *fields)],
                    *confidence,
                    suggestions,
                )
            });

        matched.unwrap_or_else(|| {
            fallback(
                PipelineCategory::ServiceOps,
                FALLBACK.to_string(),
                0.65,
                BOOKING_SUGGESTIONS,
                input.options,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, store};
    use crate::models::PipelineCategory;

    #[test]
    fn test_booking() {
        let ks = store();
        let r = run(PipelineCategory::ServiceOps, &ks, "I want to book an appointment");
        assert_eq!(r.sources, ["studio"]);
        assert!(r.answer.contains("book an appointment online"));
        assert!(r.answer.contains("deposit of $100"));
        assert!(r.confidence >= 0.8);
    }

    #[test]
    fn test_cancel_beats_booking() {
        let ks = store();
        let r = run(PipelineCategory::ServiceOps, &ks, "I need to cancel my booking");
        assert!(r.answer.contains("48 hours"));
        assert!(!r.answer.contains("book an appointment online"));
    }

    #[test]
    fn test_hours_and_walk_ins() {
        let ks = store();
        let r = run(PipelineCategory::ServiceOps, &ks, "what time do you open on Sunday?");
        assert!(r.answer.contains("Tuesday to Saturday"));

        let r = run(PipelineCategory::ServiceOps, &ks, "do you take walk-ins?");
        assert!(r.answer.starts_with("Walk-ins are welcome"));
        assert_eq!(r.suggestions.len(), 3);
    }

    #[test]
    fn test_unmatched_falls_back() {
        let ks = store();
        let r = run(PipelineCategory::ServiceOps, &ks, "parking?");
        assert!(r.sources.is_empty());
        assert!(r.confidence < 0.8);
    }

    #[test]
    fn test_triggers_match_whole_words() {
        let ks = store();
        // "notebook" is not a booking.
        let r = run(PipelineCategory::ServiceOps, &ks, "can I bring a notebook of ideas?");
        assert!(r.sources.is_empty());

        let r = run(
            PipelineCategory::ServiceOps,
            &ks,
            "Can I see artists who specialise in this style?",
        );
        assert_eq!(r.sources, ["studio"]);
    }
}
