//! The `pipelines` command.

use anyhow::Result;

use crate::config::Config;

/// Print the configured pipelines as a table.
pub fn run_list_pipelines(config: &Config) -> Result<()> {
    println!(
        "{:<20} {:<14} {:>6} {:>7} {:>8}  DESCRIPTION",
        "PIPELINE", "CATEGORY", "LIMIT", "CACHE", "TTL(s)"
    );
    for (name, p) in &config.pipelines {
        let category = p
            .category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| "routed".to_string());
        println!(
            "{:<20} {:<14} {:>6} {:>7} {:>8}  {}",
            name,
            category,
            p.rate_limit,
            if p.cache_enabled { "on" } else { "off" },
            p.cache_ttl_secs,
            p.description
        );
    }
    println!();
    println!(
        "Rate window: {}s · cache capacity: {} · engine: {}",
        config.rate_limit.window_secs, config.cache.max_size, config.engine.provider
    );
    Ok(())
}
