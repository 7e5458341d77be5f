//! The `ask`, `route` and `chat` commands.

use anyhow::{bail, Result};
use ink_router_core::{extract, ConversationTurn, QueryContext, Role};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::dispatcher::{DispatchResult, RequestDispatcher};

/// Keep at most this many turns of history in a chat session.
const MAX_HISTORY: usize = 20;

fn print_result(outcome: &DispatchResult) {
    let meta = &outcome.metadata;
    match (&outcome.result, &outcome.error) {
        (Some(result), _) => {
            println!(
                "[{}] confidence {:.2} · {} · {} ms",
                result.category,
                result.confidence,
                if meta.cache_hit { "cache hit" } else { "cache miss" },
                meta.elapsed_ms
            );
            println!();
            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!();
                println!("Sources: {}", result.sources.join(", "));
            }
            if !result.suggestions.is_empty() {
                println!();
                println!("You could also ask:");
                for s in &result.suggestions {
                    println!("  - {}", s);
                }
            }
        }
        (None, Some(error)) => {
            eprintln!("Error [{}]: {}", error.code(), error);
        }
        (None, None) => {}
    }
}

/// Run the `ask` command: dispatch a single query and print the result.
pub async fn run_ask(
    config: &Config,
    query: &str,
    pipeline: &str,
    client: &str,
    mobile: bool,
    json: bool,
) -> Result<()> {
    let dispatcher = RequestDispatcher::from_config(config)?;
    let context = QueryContext {
        history: Vec::new(),
        mobile,
    };
    let outcome = dispatcher.process(pipeline, query, &context, client).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_result(&outcome);
    }

    if let Some(error) = outcome.error {
        bail!("{}", error);
    }
    Ok(())
}

/// Run the `route` command: show how a query would be routed.
pub fn run_route(config: &Config, query: &str, json: bool) -> Result<()> {
    let dispatcher = RequestDispatcher::from_config(config)?;
    let route = dispatcher.route(query);
    let entities = extract(query);

    if json {
        let body = serde_json::json!({
            "selected": route.selected,
            "scores": route.scores,
            "entities": entities,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Category: {}", route.selected);
    println!();
    println!("Scores:");
    for (category, score) in &route.scores {
        println!("  {:<14} {}", category.as_str(), score);
    }
    println!();
    if entities.is_empty() {
        println!("Entities: none");
    } else {
        println!("Entities:");
        for (kind, values) in entities.iter() {
            println!("  {:<14} {}", kind.as_str(), values.join(", "));
        }
    }
    Ok(())
}

/// Run the `chat` command: a line-based session over stdin.
///
/// Each line is dispatched with the conversation so far as history. An
/// empty line, `exit` or end of input ends the session.
pub async fn run_chat(config: &Config, pipeline: &str, client: &str) -> Result<()> {
    let dispatcher = RequestDispatcher::from_config(config)?;
    if dispatcher.pipeline_info(pipeline).is_none() {
        bail!("Unknown pipeline: '{}'. Run `ink pipelines` to list them.", pipeline);
    }
    let cleanup = dispatcher.spawn_cleanup(config.cleanup_interval());

    println!(
        "Chatting with {} via '{}'. Empty line or 'exit' to quit.",
        dispatcher.knowledge().data().studio.name,
        pipeline
    );

    let mut context = QueryContext::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!();
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line == "exit" {
            break;
        }

        let outcome = dispatcher.process(pipeline, line, &context, client).await;
        print_result(&outcome);

        context.history.push(ConversationTurn {
            role: Role::User,
            content: line.to_string(),
        });
        if let Some(result) = &outcome.result {
            context.history.push(ConversationTurn {
                role: Role::Assistant,
                content: result.answer.clone(),
            });
        }
        if context.history.len() > MAX_HISTORY {
            let excess = context.history.len() - MAX_HISTORY;
            context.history.drain(..excess);
        }
    }

    cleanup.abort();

    let stats = dispatcher.cache_stats();
    println!();
    println!(
        "Cache: {} / {} entries, average hits {:.2}",
        stats.size, stats.max_size, stats.average_hit_rate
    );
    Ok(())
}
