//! Typed knowledge records and load-time validation.
//!
//! One record type per knowledge topic. Unknown keys are rejected by serde
//! and [`KnowledgeData::validate`] checks the cross-field rules, so a
//! malformed knowledge file fails at startup instead of producing subtly
//! wrong answers at request time.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The whole knowledge file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeData {
    pub studio: StudioInfo,
    pub styles: BTreeMap<String, StyleRecord>,
    pub placements: BTreeMap<String, PlacementRecord>,
    pub pricing: PricingRecord,
    pub aftercare: AftercareRecord,
    pub sales: SalesRecord,
    pub conversation: ConversationRecord,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudioInfo {
    pub name: String,
    pub hours: String,
    pub booking: String,
    pub deposit: String,
    pub consultation: String,
    pub cancellation: String,
    pub walk_ins: String,
    pub artists: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleRecord {
    pub name: String,
    pub description: String,
    pub characteristics: String,
    /// Placement ids this style suits. Must refer to `[placements.*]`.
    #[serde(default)]
    pub best_placements: Vec<String>,
    /// Lowercase terms that identify this style in free text.
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementRecord {
    pub name: String,
    /// Relative pain on a 1 to 10 scale.
    pub pain_level: u8,
    pub visibility: String,
    pub healing: String,
    pub notes: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingRecord {
    pub currency: String,
    pub hourly_rate: u32,
    pub minimum: u32,
    pub overview: String,
    pub sizes: BTreeMap<String, SizePrice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizePrice {
    pub label: String,
    pub range: String,
    pub sessions: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AftercareRecord {
    pub first_day: String,
    pub first_weeks: String,
    pub long_term: String,
    pub warning_signs: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesRecord {
    pub overview: String,
    pub promotions: String,
    pub gift_cards: String,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRecord {
    pub name: String,
    pub price: u32,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationRecord {
    pub greeting: String,
    pub returning_greeting: String,
    pub thanks: String,
    pub identity: String,
    pub help: String,
    pub fallback: String,
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} must not be empty", field);
    }
    Ok(())
}

fn require_id(section: &str, id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        bail!(
            "{} id '{}' must be lowercase letters, digits, or '_'",
            section,
            id
        );
    }
    Ok(())
}

fn require_aliases(field: &str, aliases: &[String]) -> Result<()> {
    for alias in aliases {
        if alias.trim().is_empty() || alias.to_lowercase() != *alias {
            bail!("{} contains an empty or non-lowercase alias '{}'", field, alias);
        }
    }
    Ok(())
}

impl KnowledgeData {
    /// Check every rule serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let s = &self.studio;
        for (field, value) in [
            ("studio.name", &s.name),
            ("studio.hours", &s.hours),
            ("studio.booking", &s.booking),
            ("studio.deposit", &s.deposit),
            ("studio.consultation", &s.consultation),
            ("studio.cancellation", &s.cancellation),
            ("studio.walk_ins", &s.walk_ins),
            ("studio.artists", &s.artists),
        ] {
            require_text(field, value)?;
        }

        if self.styles.is_empty() {
            bail!("at least one [styles.*] entry is required");
        }
        if self.placements.is_empty() {
            bail!("at least one [placements.*] entry is required");
        }

        for (id, place) in &self.placements {
            require_id("placement", id)?;
            require_text(&format!("placements.{}.name", id), &place.name)?;
            require_text(&format!("placements.{}.visibility", id), &place.visibility)?;
            require_text(&format!("placements.{}.healing", id), &place.healing)?;
            require_text(&format!("placements.{}.notes", id), &place.notes)?;
            require_aliases(&format!("placements.{}.aliases", id), &place.aliases)?;
            if !(1..=10).contains(&place.pain_level) {
                bail!(
                    "placements.{}.pain_level must be in [1, 10], got {}",
                    id,
                    place.pain_level
                );
            }
        }

        for (id, style) in &self.styles {
            require_id("style", id)?;
            require_text(&format!("styles.{}.name", id), &style.name)?;
            require_text(&format!("styles.{}.description", id), &style.description)?;
            require_text(
                &format!("styles.{}.characteristics", id),
                &style.characteristics,
            )?;
            require_aliases(&format!("styles.{}.aliases", id), &style.aliases)?;
            for place in &style.best_placements {
                if !self.placements.contains_key(place) {
                    bail!(
                        "styles.{}.best_placements refers to unknown placement '{}'",
                        id,
                        place
                    );
                }
            }
        }

        let p = &self.pricing;
        require_text("pricing.currency", &p.currency)?;
        require_text("pricing.overview", &p.overview)?;
        if p.hourly_rate == 0 {
            bail!("pricing.hourly_rate must be > 0");
        }
        if p.sizes.is_empty() {
            bail!("at least one [pricing.sizes.*] entry is required");
        }
        for (id, size) in &p.sizes {
            require_id("pricing size", id)?;
            require_text(&format!("pricing.sizes.{}.label", id), &size.label)?;
            require_text(&format!("pricing.sizes.{}.range", id), &size.range)?;
            require_text(&format!("pricing.sizes.{}.sessions", id), &size.sessions)?;
        }

        let a = &self.aftercare;
        require_text("aftercare.first_day", &a.first_day)?;
        require_text("aftercare.first_weeks", &a.first_weeks)?;
        require_text("aftercare.long_term", &a.long_term)?;
        require_text("aftercare.warning_signs", &a.warning_signs)?;

        require_text("sales.overview", &self.sales.overview)?;
        require_text("sales.promotions", &self.sales.promotions)?;
        require_text("sales.gift_cards", &self.sales.gift_cards)?;
        for (id, pkg) in &self.sales.packages {
            require_id("package", id)?;
            require_text(&format!("sales.packages.{}.name", id), &pkg.name)?;
            require_text(
                &format!("sales.packages.{}.description", id),
                &pkg.description,
            )?;
        }

        let c = &self.conversation;
        for (field, value) in [
            ("conversation.greeting", &c.greeting),
            ("conversation.returning_greeting", &c.returning_greeting),
            ("conversation.thanks", &c.thanks),
            ("conversation.identity", &c.identity),
            ("conversation.help", &c.help),
            ("conversation.fallback", &c.fallback),
        ] {
            require_text(field, value)?;
        }

        Ok(())
    }
}
