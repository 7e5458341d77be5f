use super::{compose, fallback, has_term, has_word, ExecutionInput, PipelineExecutor};
use crate::models::{PipelineCategory, PipelineResult};

const THANKS: &[&str] = &["thank*", "thx", "cheers", "appreciate*"];
const IDENTITY: &[&str] = &[
    "who are you",
    "what are you",
    "your name",
    "are you a bot",
    "are you human",
];
const HELP: &[&str] = &["help", "what can you", "what do you do"];
const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];
const GREETING_WORDS: &[&str] = &["hi", "hey", "hello", "hiya", "howdy", "yo"];

pub(super) const SUGGESTIONS: &[&str] = &[
    "What tattoo styles do you do?",
    "How do I book an appointment?",
    "How much does a small tattoo cost?",
    "How do I care for a new tattoo?",
];

const FALLBACK: &str = "Thanks for reaching out! I can help with tattoo styles, placement, aftercare, pricing and booking. What would you like to know?";

/// Greetings, small talk and the general fallback.
///
/// The only executor that reads conversation history: a greeting on a
/// conversation that already has turns is answered with the returning
/// greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationExecutor;

impl ConversationExecutor {
    fn field(&self, text: &str, input: &ExecutionInput<'_>) -> Option<&'static str> {
        if has_term(text, THANKS) {
            Some("thanks")
        } else if has_term(text, IDENTITY) {
            Some("identity")
        } else if has_term(text, HELP) {
            Some("help")
        } else if has_term(text, GREETING_PHRASES) || has_word(text, GREETING_WORDS) {
            Some(if input.context.has_history() {
                "returning_greeting"
            } else {
                "greeting"
            })
        } else {
            None
        }
    }
}

impl PipelineExecutor for ConversationExecutor {
    fn category(&self) -> PipelineCategory {
        PipelineCategory::Conversation
    }

    fn run(&self, input: &ExecutionInput<'_>) -> PipelineResult {
        let text = input.lowered();
        let matched = self.field(&text, input).and_then(|field| {
            compose(
                PipelineCategory::Conversation,
                input,
                &[("conversation".to_string(), &[field][..])],
                0.9,
                SUGGESTIONS,
            )
        });

        matched.unwrap_or_else(|| {
            let answer = input
                .knowledge
                .resolve("conversation", &["fallback"])
                .unwrap_or_else(|| FALLBACK.to_string());
            fallback(
                PipelineCategory::Conversation,
                answer,
                0.7,
                SUGGESTIONS,
                input.options,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, run_with, store};
    use crate::models::{ConversationTurn, PipelineCategory, QueryContext, Role};

    #[test]
    fn test_greeting_uses_whole_words() {
        let ks = store();
        let r = run(PipelineCategory::Conversation, &ks, "Hi!");
        assert!(r.answer.starts_with("Hi there!"));
        assert_eq!(r.sources, ["conversation"]);

        let r = run(PipelineCategory::Conversation, &ks, "this is it");
        assert!(r.sources.is_empty());
    }

    #[test]
    fn test_returning_greeting_with_history() {
        let ks = store();
        let context = QueryContext {
            history: vec![ConversationTurn {
                role: Role::User,
                content: "what is blackwork?".to_string(),
            }],
            mobile: false,
        };
        let r = run_with(PipelineCategory::Conversation, &ks, "hello again", &context, 4);
        assert!(r.answer.starts_with("Welcome back!"));
    }

    #[test]
    fn test_thanks_and_identity() {
        let ks = store();
        let r = run(PipelineCategory::Conversation, &ks, "thanks so much");
        assert!(r.answer.starts_with("You're very welcome!"));
        let r = run(PipelineCategory::Conversation, &ks, "who are you?");
        assert!(r.answer.contains("studio assistant"));
        let r = run(PipelineCategory::Conversation, &ks, "who are your artists?");
        assert!(!r.answer.contains("studio assistant"));
    }

    #[test]
    fn test_fallback_comes_from_knowledge() {
        let ks = store();
        let r = run(PipelineCategory::Conversation, &ks, "book a watercolor");
        assert!(r.answer.starts_with("Thanks for reaching out!"));
        assert!(r.sources.is_empty());
        assert!((r.confidence - 0.7).abs() < f64::EPSILON);
    }
}
