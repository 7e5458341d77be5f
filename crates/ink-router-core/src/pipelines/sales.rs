use super::{compose, fallback, has_term, pricing_parts, ExecutionInput, PipelineExecutor};
use crate::models::{EntityKind, PipelineCategory, PipelineResult};

const GIFT_TRIGGERS: &[&str] = &["gift*", "voucher", "present for"];
const PACKAGE_TRIGGERS: &[&str] = &[
    "package",
    "membership",
    "member",
    "subscription",
    "prepaid",
    "plan",
    "bundle",
];
const PROMO_TRIGGERS: &[&str] = &[
    "discount",
    "deal",
    "promo*",
    "offer",
    "coupon",
    "special",
    "sale",
];
const QUOTE_TRIGGERS: &[&str] = &[
    "price",
    "pricing",
    "cost*",
    "how much",
    "quote",
    "afford*",
    "expensive",
    "cheap*",
    "budget",
    "rate",
];

pub(super) const GIFT_SUGGESTIONS: &[&str] = &[
    "Can a gift card cover the deposit?",
    "Do gift cards expire?",
    "Do you have any promotions right now?",
];
pub(super) const PACKAGE_SUGGESTIONS: &[&str] = &[
    "What does the Collector Membership include?",
    "Is the Sleeve Plan worth it for a full sleeve?",
    "Do you have any promotions right now?",
    "Can I buy a package as a gift?",
];
pub(super) const QUOTE_SUGGESTIONS: &[&str] = &[
    "How much is a full sleeve?",
    "Do you offer any discounts?",
    "Do you have prepaid packages?",
    "How does the deposit work?",
];

const FALLBACK: &str = "We offer custom quotes, prepaid session packages, seasonal promotions and gift cards. Tell me the size and placement you have in mind and I can give you a price range.";

/// Packages, promotions, gift cards and quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesExecutor;

impl SalesExecutor {
    fn sales_fields(
        &self,
        input: &ExecutionInput<'_>,
        fields: &'static [&'static str],
        suggestions: &[&str],
    ) -> Option<PipelineResult> {
        compose(
            PipelineCategory::Sales,
            input,
            &[("sales".to_string(), fields)],
            0.85,
            suggestions,
        )
    }
}

impl PipelineExecutor for SalesExecutor {
    fn category(&self) -> PipelineCategory {
        PipelineCategory::Sales
    }

    fn run(&self, input: &ExecutionInput<'_>) -> PipelineResult {
        let text = input.lowered();
        let sized = !input.entities.get(EntityKind::Size).is_empty();

        let matched = if has_term(&text, GIFT_TRIGGERS) {
            self.sales_fields(input, &["gift_cards"], GIFT_SUGGESTIONS)
        } else if has_term(&text, PACKAGE_TRIGGERS) {
            self.sales_fields(input, &["overview", "packages"], PACKAGE_SUGGESTIONS)
        } else if has_term(&text, PROMO_TRIGGERS) {
            self.sales_fields(input, &["promotions"], QUOTE_SUGGESTIONS)
        } else if sized || has_term(&text, QUOTE_TRIGGERS) {
            compose(
                PipelineCategory::Sales,
                input,
                &pricing_parts(input.entities),
                0.85,
                QUOTE_SUGGESTIONS,
            )
        } else {
            None
        };

        matched.unwrap_or_else(|| {
            fallback(
                PipelineCategory::Sales,
                FALLBACK.to_string(),
                0.6,
                QUOTE_SUGGESTIONS,
                input.options,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, store};
    use crate::knowledge::KnowledgeStore;
    use crate::models::PipelineCategory;

    #[test]
    fn test_gift_cards() {
        let ks = store();
        let r = run(PipelineCategory::Sales, &ks, "Do you sell gift cards?");
        assert_eq!(r.sources, ["sales"]);
        assert!(r.answer.contains("never expire"));
    }

    #[test]
    fn test_packages_listed() {
        let ks = store();
        let r = run(PipelineCategory::Sales, &ks, "what membership options do you have");
        assert!(r.answer.contains("Collector Membership ($40)"));
        assert!(r.confidence >= 0.8);
    }

    #[test]
    fn test_size_alone_triggers_quote() {
        let ks = store();
        let r = run(PipelineCategory::Sales, &ks, "a full sleeve");
        assert_eq!(r.sources, ["pricing.sizes.sleeve", "pricing"]);
    }

    #[test]
    fn test_missing_packages_degrade_to_fallback() {
        let source = include_str!("../../data/studio.toml");
        let start = source.find("[sales.packages.flash_day]").unwrap();
        let end = source.find("[conversation]").unwrap();
        let trimmed = format!("{}{}", &source[..start], &source[end..]);
        let ks = KnowledgeStore::from_toml_str(&trimmed).unwrap();

        let r = run(PipelineCategory::Sales, &ks, "any packages?");
        assert!(r.sources.is_empty());
        assert!(!r.answer.is_empty());
        assert!(r.confidence < 0.8);
    }

    #[test]
    fn test_plan_inside_placement_is_not_a_package() {
        let ks = store();
        let r = run(PipelineCategory::Sales, &ks, "what does a chest placement cost?");
        assert_eq!(r.sources, ["pricing"]);
    }
}
