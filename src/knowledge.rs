//! Knowledge loading.
//!
//! The studio knowledge is read exactly once at startup. Without a
//! `[knowledge] path` the data bundled with `ink-router-core` is used.

use anyhow::{Context, Result};
use ink_router_core::KnowledgeStore;
use std::path::Path;

use crate::config::Config;

/// Read and validate a knowledge file.
pub fn load_knowledge_file(path: &Path) -> Result<KnowledgeStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge file: {}", path.display()))?;
    KnowledgeStore::from_toml_str(&content)
        .with_context(|| format!("Failed to load knowledge file: {}", path.display()))
}

/// The knowledge store selected by `config`.
pub fn load_knowledge(config: &Config) -> Result<KnowledgeStore> {
    match &config.knowledge.path {
        Some(path) => load_knowledge_file(path),
        None => KnowledgeStore::builtin(),
    }
}

/// Run the `knowledge` command: validate the knowledge file and print a summary.
pub fn run_knowledge(config: &Config) -> Result<()> {
    let store = load_knowledge(config)?;
    let summary = store.summary();
    let source = config
        .knowledge
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    println!("Ink Router — Knowledge");
    println!("======================");
    println!();
    println!("  Source:      {}", source);
    println!("  Studio:      {}", summary.studio);
    println!("  Styles:      {}", summary.styles);
    println!("  Placements:  {}", summary.placements);
    println!("  Sizes:       {}", summary.sizes);
    println!("  Packages:    {}", summary.packages);
    println!("  Topics:      {}", summary.topics);
    println!();
    println!(
        "  Style ids:   {}",
        store.style_ids().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}
