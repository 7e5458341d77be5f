//! Immutable studio knowledge store.
//!
//! The store is built once from a TOML document (see [`schema`]) and is
//! read-only afterwards; there is no mutation API. At load time every typed
//! record is flattened into a fragment index keyed by topic and field:
//!
//! | Topic | Fields |
//! |-------|--------|
//! | `studio` | `name`, `hours`, `booking`, `deposit`, `consultation`, `cancellation`, `walk_ins`, `artists` |
//! | `styles` | `overview` |
//! | `styles.<id>` | `name`, `description`, `characteristics`, `placements` |
//! | `placements` | `overview`, `least_painful`, `most_painful` |
//! | `placements.<id>` | `name`, `pain`, `visibility`, `healing`, `notes` |
//! | `pricing` | `overview`, `rates`, `sessions` |
//! | `pricing.sizes.<id>` | `label`, `range`, `sessions` |
//! | `aftercare` | `first_day`, `first_weeks`, `long_term`, `warning_signs` |
//! | `sales` | `overview`, `promotions`, `gift_cards`, `packages` |
//! | `conversation` | `greeting`, `returning_greeting`, `thanks`, `identity`, `help`, `fallback` |
//!
//! Executors compose answers exclusively through [`KnowledgeStore::resolve`].

pub mod schema;

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub use schema::KnowledgeData;
use schema::{PlacementRecord, StyleRecord};

const BUILTIN_KNOWLEDGE: &str = include_str!("../../data/studio.toml");

type Fragments = BTreeMap<&'static str, String>;

/// Counts reported by `ink knowledge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeSummary {
    pub studio: String,
    pub styles: usize,
    pub placements: usize,
    pub sizes: usize,
    pub packages: usize,
    pub topics: usize,
}

/// Loaded, validated, read-only knowledge.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    data: KnowledgeData,
    fragments: HashMap<String, Fragments>,
}

impl KnowledgeStore {
    /// Parse and validate a knowledge document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let data: KnowledgeData =
            toml::from_str(content).context("Failed to parse knowledge file")?;
        Self::from_data(data)
    }

    /// Validate already-parsed knowledge and build the fragment index.
    pub fn from_data(data: KnowledgeData) -> Result<Self> {
        data.validate().context("Invalid knowledge file")?;
        let fragments = build_fragments(&data);
        Ok(Self { data, fragments })
    }

    /// The knowledge bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_KNOWLEDGE)
    }

    pub fn data(&self) -> &KnowledgeData {
        &self.data
    }

    /// Concatenate the named fields of `topic`, separated by a space.
    ///
    /// Returns `None` if the topic or any requested field is missing, so
    /// callers can fall back instead of emitting a partial answer.
    pub fn resolve(&self, topic: &str, fields: &[&str]) -> Option<String> {
        let frags = self.fragments.get(topic)?;
        let parts = fields
            .iter()
            .map(|f| frags.get(f).map(String::as_str))
            .collect::<Option<Vec<&str>>>()?;
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(" "))
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.fragments.contains_key(topic)
    }

    /// Find the style id whose id, name, or alias equals `term`.
    pub fn find_style(&self, term: &str) -> Option<&str> {
        let term = term.trim().to_lowercase();
        self.data
            .styles
            .iter()
            .find(|(id, style)| style_matches(id, style, &term))
            .map(|(id, _)| id.as_str())
    }

    /// Find the placement id whose id, name, or alias equals `term`.
    pub fn find_placement(&self, term: &str) -> Option<&str> {
        let term = term.trim().to_lowercase();
        self.data
            .placements
            .iter()
            .find(|(id, place)| placement_matches(id, place, &term))
            .map(|(id, _)| id.as_str())
    }

    pub fn style(&self, id: &str) -> Option<&StyleRecord> {
        self.data.styles.get(id)
    }

    pub fn placement(&self, id: &str) -> Option<&PlacementRecord> {
        self.data.placements.get(id)
    }

    pub fn style_ids(&self) -> impl Iterator<Item = &str> {
        self.data.styles.keys().map(String::as_str)
    }

    pub fn summary(&self) -> KnowledgeSummary {
        KnowledgeSummary {
            studio: self.data.studio.name.clone(),
            styles: self.data.styles.len(),
            placements: self.data.placements.len(),
            sizes: self.data.pricing.sizes.len(),
            packages: self.data.sales.packages.len(),
            topics: self.fragments.len(),
        }
    }
}

fn id_as_words(id: &str) -> String {
    id.replace('_', " ")
}

fn style_matches(id: &str, style: &StyleRecord, term: &str) -> bool {
    id_as_words(id) == term
        || style.name.to_lowercase() == term
        || style.aliases.iter().any(|a| a == term)
}

fn placement_matches(id: &str, place: &PlacementRecord, term: &str) -> bool {
    id_as_words(id) == term
        || place.name.to_lowercase() == term
        || place.aliases.iter().any(|a| a == term)
}

/// Join names as "a, b, and c".
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

fn money(amount: u32, currency: &str) -> String {
    match currency {
        "USD" | "CAD" | "AUD" => format!("${}", amount),
        "EUR" => format!("€{}", amount),
        "GBP" => format!("£{}", amount),
        other => format!("{} {}", amount, other),
    }
}

/// Placements ranked by pain level, ties broken by id.
fn placement_overview(data: &KnowledgeData) -> Fragments {
    let mut ranked: Vec<(&String, &PlacementRecord)> = data.placements.iter().collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| a.pain_level.cmp(&b.pain_level).then(a_id.cmp(b_id)));

    let names = |places: &[(&String, &PlacementRecord)]| -> Vec<String> {
        places.iter().map(|(_, place)| place.name.to_lowercase()).collect()
    };
    let least = names(&ranked[..ranked.len().min(3)]);
    let mut most_ranked = ranked.clone();
    most_ranked.sort_by(|(a_id, a), (b_id, b)| b.pain_level.cmp(&a.pain_level).then(a_id.cmp(b_id)));
    let most = names(&most_ranked[..most_ranked.len().min(3)]);

    let mut frags = Fragments::from([(
        "overview",
        format!(
            "We tattoo {} placements. Fleshy areas hurt less than spots over bone or thin skin.",
            ranked.len()
        ),
    )]);
    if !least.is_empty() {
        frags.insert(
            "least_painful",
            format!("The least painful placements are the {}.", join_names(&least)),
        );
        frags.insert(
            "most_painful",
            format!("The most painful placements are the {}.", join_names(&most)),
        );
    }
    frags
}

fn build_fragments(data: &KnowledgeData) -> HashMap<String, Fragments> {
    let mut index: HashMap<String, Fragments> = HashMap::new();
    let s = &data.studio;

    index.insert(
        "studio".to_string(),
        Fragments::from([
            ("name", s.name.clone()),
            ("hours", s.hours.clone()),
            ("booking", s.booking.clone()),
            ("deposit", s.deposit.clone()),
            ("consultation", s.consultation.clone()),
            ("cancellation", s.cancellation.clone()),
            ("walk_ins", s.walk_ins.clone()),
            ("artists", s.artists.clone()),
        ]),
    );

    let style_names: Vec<String> = data.styles.values().map(|st| st.name.clone()).collect();
    index.insert(
        "styles".to_string(),
        Fragments::from([(
            "overview",
            format!(
                "Our artists work in {} styles: {}.",
                style_names.len(),
                join_names(&style_names)
            ),
        )]),
    );

    for (id, style) in &data.styles {
        let mut frags = Fragments::from([
            ("name", style.name.clone()),
            ("description", style.description.clone()),
            ("characteristics", style.characteristics.clone()),
        ]);
        let names: Vec<String> = style
            .best_placements
            .iter()
            .filter_map(|p| data.placements.get(p))
            .map(|p| p.name.to_lowercase())
            .collect();
        if !names.is_empty() {
            frags.insert(
                "placements",
                format!(
                    "{} works especially well on the {}.",
                    style.name,
                    join_names(&names)
                ),
            );
        }
        index.insert(format!("styles.{}", id), frags);
    }

    for (id, place) in &data.placements {
        index.insert(
            format!("placements.{}", id),
            Fragments::from([
                ("name", place.name.clone()),
                (
                    "pain",
                    format!(
                        "{} tattoos rate about {}/10 on the pain scale.",
                        place.name, place.pain_level
                    ),
                ),
                ("visibility", place.visibility.clone()),
                ("healing", place.healing.clone()),
                ("notes", place.notes.clone()),
            ]),
        );
    }

    index.insert("placements".to_string(), placement_overview(data));

    let p = &data.pricing;
    let sessions: Vec<String> = p
        .sizes
        .values()
        .map(|size| format!("{}: {}", size.label, size.sessions))
        .collect();
    index.insert(
        "pricing".to_string(),
        Fragments::from([
            ("overview", p.overview.clone()),
            (
                "rates",
                format!(
                    "Custom work is {} per hour with a {} minimum.",
                    money(p.hourly_rate, &p.currency),
                    money(p.minimum, &p.currency)
                ),
            ),
            (
                "sessions",
                format!("Time in the chair depends on size. {}", sessions.join(" ")),
            ),
        ]),
    );
    for (id, size) in &p.sizes {
        index.insert(
            format!("pricing.sizes.{}", id),
            Fragments::from([
                ("label", size.label.clone()),
                ("range", size.range.clone()),
                ("sessions", size.sessions.clone()),
            ]),
        );
    }

    let a = &data.aftercare;
    index.insert(
        "aftercare".to_string(),
        Fragments::from([
            ("first_day", a.first_day.clone()),
            ("first_weeks", a.first_weeks.clone()),
            ("long_term", a.long_term.clone()),
            ("warning_signs", a.warning_signs.clone()),
        ]),
    );

    let mut sales = Fragments::from([
        ("overview", data.sales.overview.clone()),
        ("promotions", data.sales.promotions.clone()),
        ("gift_cards", data.sales.gift_cards.clone()),
    ]);
    if !data.sales.packages.is_empty() {
        let listed: Vec<String> = data
            .sales
            .packages
            .values()
            .map(|pkg| {
                format!(
                    "{} ({}): {}",
                    pkg.name,
                    money(pkg.price, &p.currency),
                    pkg.description
                )
            })
            .collect();
        sales.insert("packages", format!("Our packages: {}", listed.join(" ")));
    }
    index.insert("sales".to_string(), sales);

    let c = &data.conversation;
    index.insert(
        "conversation".to_string(),
        Fragments::from([
            ("greeting", c.greeting.clone()),
            ("returning_greeting", c.returning_greeting.clone()),
            ("thanks", c.thanks.clone()),
            ("identity", c.identity.clone()),
            ("help", c.help.clone()),
            ("fallback", c.fallback.clone()),
        ]),
    );

    index
}
