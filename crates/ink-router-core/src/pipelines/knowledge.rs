use super::{compose, fallback, has_term, pricing_parts, ExecutionInput, Part, PipelineExecutor};
use crate::models::{EntityKind, PipelineCategory, PipelineResult};

const AFTERCARE_TRIGGERS: &[&str] = &[
    "aftercare",
    "after care",
    "heal*",
    "care for",
    "look after",
    "wash*",
    "itch*",
    "peel*",
    "scab*",
    "infect*",
    "swell*",
    "swim*",
    "moisturi*",
    "doctor",
];
const WARNING_TRIGGERS: &[&str] = &[
    "infect*",
    "swell*",
    "swollen",
    "pus",
    "fever",
    "red",
    "redness",
    "doctor",
];
const PAIN_TRIGGERS: &[&str] = &["hurt*", "pain", "painful", "sore"];
const SESSION_TRIGGERS: &[&str] = &["how long", "session*", "sitting*"];
const PRICING_TRIGGERS: &[&str] = &["price", "pricing", "cost*", "how much", "quote", "rate"];
const PLACEMENT_TRIGGERS: &[&str] = &["placement", "where should", "spot"];
const STYLE_TRIGGERS: &[&str] = &["style"];

pub(super) const STYLE_SUGGESTIONS: &[&str] = &[
    "Which placements suit this style?",
    "How long does a piece like this take?",
    "How much would a medium piece cost?",
    "Can I see artists who specialise in this style?",
];
pub(super) const PLACEMENT_SUGGESTIONS: &[&str] = &[
    "Which styles work well here?",
    "How long does it take to heal?",
    "What are the least painful placements?",
    "How much would a small piece cost?",
];
pub(super) const AFTERCARE_SUGGESTIONS: &[&str] = &[
    "When can I go swimming again?",
    "Is it normal for my tattoo to peel?",
    "Which moisturiser should I use?",
    "When should I see a doctor?",
];
pub(super) const PRICING_SUGGESTIONS: &[&str] = &[
    "Do you require a deposit?",
    "How many sessions will I need?",
    "Do you offer packages?",
    "How do I book a consultation?",
];
pub(super) const GENERAL_SUGGESTIONS: &[&str] = &[
    "What is traditional tattoo style?",
    "Which placements hurt the least?",
    "How do I care for a new tattoo?",
    "How much does a small tattoo cost?",
];

const FALLBACK: &str = "I can tell you about tattoo styles such as traditional, realism and Japanese, which placements hurt least, how to care for a new tattoo, and what a piece might cost. What are you thinking of getting?";

/// Styles, placements, aftercare and pricing knowledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeExecutor;

impl KnowledgeExecutor {
    fn aftercare(&self, input: &ExecutionInput<'_>, text: &str) -> Option<PipelineResult> {
        if !has_term(text, AFTERCARE_TRIGGERS) {
            return None;
        }
        let fields: &[&str] = if has_term(text, WARNING_TRIGGERS) {
            &["first_day", "first_weeks", "warning_signs"]
        } else {
            &["first_day", "first_weeks", "long_term"]
        };
        compose(
            PipelineCategory::Knowledge,
            input,
            &[("aftercare".to_string(), fields)],
            0.9,
            AFTERCARE_SUGGESTIONS,
        )
    }

    fn placement_id<'k>(&self, input: &ExecutionInput<'k>) -> Option<&'k str> {
        input
            .entities
            .get(EntityKind::BodyPart)
            .iter()
            .find_map(|part| input.knowledge.find_placement(part))
    }

    fn placement(
        &self,
        input: &ExecutionInput<'_>,
        fields: &'static [&'static str],
    ) -> Option<PipelineResult> {
        let id = self.placement_id(input)?;
        compose(
            PipelineCategory::Knowledge,
            input,
            &[(format!("placements.{}", id), fields)],
            0.85,
            PLACEMENT_SUGGESTIONS,
        )
    }

    fn style(&self, input: &ExecutionInput<'_>) -> Option<PipelineResult> {
        let id = input
            .entities
            .get(EntityKind::Style)
            .iter()
            .find_map(|term| input.knowledge.find_style(term))?;
        let topic = format!("styles.{}", id);
        let with_placements: Part<'_> = (
            topic.clone(),
            &["description", "characteristics", "placements"],
        );
        let without: Part<'_> = (topic, &["description", "characteristics"]);
        compose(
            PipelineCategory::Knowledge,
            input,
            &[with_placements],
            0.9,
            STYLE_SUGGESTIONS,
        )
        .or_else(|| {
            compose(
                PipelineCategory::Knowledge,
                input,
                &[without],
                0.9,
                STYLE_SUGGESTIONS,
            )
        })
    }

    fn sessions(&self, input: &ExecutionInput<'_>, text: &str) -> Option<PipelineResult> {
        if !has_term(text, SESSION_TRIGGERS) {
            return None;
        }
        let part: Part<'_> = match pricing_parts(input.entities).first() {
            Some((topic, _)) if topic.starts_with("pricing.sizes.") => {
                (topic.clone(), &["sessions"][..])
            }
            _ => ("pricing".to_string(), &["sessions"][..]),
        };
        compose(
            PipelineCategory::Knowledge,
            input,
            &[part],
            0.85,
            PRICING_SUGGESTIONS,
        )
    }

    /// Pain ranking across all placements, for questions that name none.
    fn placement_overview(
        &self,
        input: &ExecutionInput<'_>,
        text: &str,
        pain: bool,
    ) -> Option<PipelineResult> {
        let fields: &[&str] = if pain {
            &["least_painful", "most_painful"]
        } else if has_term(text, PLACEMENT_TRIGGERS) {
            &["overview", "least_painful"]
        } else {
            return None;
        };
        compose(
            PipelineCategory::Knowledge,
            input,
            &[("placements".to_string(), fields)],
            0.8,
            PLACEMENT_SUGGESTIONS,
        )
    }

    fn style_overview(&self, input: &ExecutionInput<'_>, text: &str) -> Option<PipelineResult> {
        if !has_term(text, STYLE_TRIGGERS) {
            return None;
        }
        compose(
            PipelineCategory::Knowledge,
            input,
            &[("styles".to_string(), &["overview"][..])],
            0.8,
            STYLE_SUGGESTIONS,
        )
    }

    fn pricing(&self, input: &ExecutionInput<'_>, text: &str) -> Option<PipelineResult> {
        if !has_term(text, PRICING_TRIGGERS) {
            return None;
        }
        compose(
            PipelineCategory::Knowledge,
            input,
            &pricing_parts(input.entities),
            0.85,
            PRICING_SUGGESTIONS,
        )
    }
}

impl PipelineExecutor for KnowledgeExecutor {
    fn category(&self) -> PipelineCategory {
        PipelineCategory::Knowledge
    }

    fn run(&self, input: &ExecutionInput<'_>) -> PipelineResult {
        let text = input.lowered();
        let pain = has_term(&text, PAIN_TRIGGERS);

        self.aftercare(input, &text)
            .or_else(|| {
                pain.then(|| self.placement(input, &["pain", "notes"]))
                    .flatten()
            })
            .or_else(|| self.style(input))
            .or_else(|| self.sessions(input, &text))
            .or_else(|| self.placement(input, &["pain", "visibility", "healing"]))
            .or_else(|| self.pricing(input, &text))
            .or_else(|| self.placement_overview(input, &text, pain))
            .or_else(|| self.style_overview(input, &text))
            .unwrap_or_else(|| {
                fallback(
                    PipelineCategory::Knowledge,
                    FALLBACK.to_string(),
                    0.65,
                    GENERAL_SUGGESTIONS,
                    input.options,
                )
            })
    }
}
